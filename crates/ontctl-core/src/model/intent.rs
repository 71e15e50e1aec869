// ── Reconciliation intent ──
//
// Typed, validated desired state for one device run. Built by the policy
// validator; read-only while reconciling.

use std::collections::BTreeMap;

use ontctl_api::Freshness;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::band::Band;

/// Desired state for one device run.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationIntent {
    /// Cached observations older than this marker are re-read.
    pub as_of: Freshness,
    pub wifi: BTreeMap<Band, BandIntent>,
    pub wan: Option<WanIntent>,
    pub voip: Option<VoipIntent>,
    pub port_forward: Option<PortForwardIntent>,
    /// `None` disables optical tagging (invalid thresholds in the policy).
    pub optical: Option<OpticalThresholds>,
    pub management: Option<ManagementIntent>,
}

impl ReconciliationIntent {
    pub fn is_empty(&self) -> bool {
        self.wifi.is_empty()
            && self.wan.is_none()
            && self.voip.is_none()
            && self.port_forward.is_none()
            && self.management.is_none()
    }
}

// ── WiFi ────────────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
pub enum SecurityMode {
    #[default]
    #[serde(rename = "wpa2")]
    #[strum(serialize = "wpa2")]
    Wpa2,
    #[serde(rename = "wpa2-wpa3")]
    #[strum(serialize = "wpa2-wpa3")]
    Wpa2Wpa3,
    #[serde(rename = "wpa3")]
    #[strum(serialize = "wpa3")]
    Wpa3,
}

#[derive(Debug, Clone)]
pub struct BandIntent {
    pub ssid: String,
    pub password: SecretString,
    pub security: SecurityMode,
    pub enabled: bool,
}

// ── WAN ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum WanIntent {
    Pppoe {
        username: String,
        password: SecretString,
        vlan: Option<u16>,
        cos: u8,
    },
    Dhcp,
}

// ── VoIP ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct VoipIntent {
    pub server: String,
    pub port: u16,
    pub registrar_port: u16,
    pub username: String,
    pub password: SecretString,
}

// ── Port forwarding ─────────────────────────────────────────────────

/// Which legacy WAN connection carries port mappings.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WanConnectionKind {
    #[default]
    Ip,
    Ppp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortRule {
    pub external_port: u16,
    pub internal_port: u16,
    pub internal_client: String,
    pub protocol: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortForwardIntent {
    pub rules: Vec<PortRule>,
    pub wan: WanConnectionKind,
}

// ── Optical ─────────────────────────────────────────────────────────

/// Receive power thresholds in dBm. Readings strictly below a threshold
/// cross it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpticalThresholds {
    pub warning: f64,
    pub critical: f64,
}

impl Default for OpticalThresholds {
    fn default() -> Self {
        Self {
            warning: -25.0,
            critical: -28.0,
        }
    }
}

/// Optical alarm state derived from one receive power reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpticalAlarm {
    pub warning: bool,
    pub critical: bool,
}

impl OpticalThresholds {
    /// Crossing critical also raises warning.
    pub fn evaluate(&self, rx_power_dbm: f64) -> OpticalAlarm {
        if rx_power_dbm < self.critical {
            OpticalAlarm {
                warning: true,
                critical: true,
            }
        } else if rx_power_dbm < self.warning {
            OpticalAlarm {
                warning: true,
                critical: false,
            }
        } else {
            OpticalAlarm {
                warning: false,
                critical: false,
            }
        }
    }
}

// ── Management ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagementIntent {
    pub periodic_inform_enabled: bool,
    pub periodic_inform_interval: u32,
}

impl Default for ManagementIntent {
    fn default() -> Self {
        Self {
            periodic_inform_enabled: true,
            periodic_inform_interval: 300,
        }
    }
}
