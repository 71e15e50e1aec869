// ── Capability keys ──
//
// Dot-namespaced, vendor-agnostic attribute names. Band-scoped keys embed
// the band (`wifi.band.5.ssid`); the registry stores them once under the
// `wifi.band.{band}.<attr>` form.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::band::Band;

const BAND_PREFIX: &str = "wifi.band.";

/// An abstract capability such as `wifi.band.5.password` or `wan.status`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityKey(String);

/// How a key is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScope<'a> {
    /// One path per device.
    Device,
    /// One path per discovered instance of `band`.
    Band { band: Band, attr: &'a str },
}

impl CapabilityKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn band(band: Band, attr: &str) -> Self {
        Self(format!("{BAND_PREFIX}{band}.{attr}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn scope(&self) -> KeyScope<'_> {
        let Some(rest) = self.0.strip_prefix(BAND_PREFIX) else {
            return KeyScope::Device;
        };
        Band::ALL
            .iter()
            .find_map(|band| {
                rest.strip_prefix(band.as_str())
                    .and_then(|r| r.strip_prefix('.'))
                    .filter(|attr| !attr.is_empty())
                    .map(|attr| KeyScope::Band { band: *band, attr })
            })
            .unwrap_or(KeyScope::Device)
    }

    /// The key under which the registry stores this capability.
    pub fn registry_key(&self) -> String {
        match self.scope() {
            KeyScope::Band { attr, .. } => format!("{BAND_PREFIX}{{band}}.{attr}"),
            KeyScope::Device => self.0.clone(),
        }
    }
}

impl fmt::Display for CapabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CapabilityKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CapabilityKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Well-known capability keys.
pub mod keys {
    // Band-scoped attribute names (combine with `CapabilityKey::band`).
    pub const SSID: &str = "ssid";
    pub const PASSWORD: &str = "password";
    pub const ENABLE: &str = "enable";
    pub const CHANNEL: &str = "channel";
    pub const SECURITY_MODE: &str = "security_mode";
    pub const MFP: &str = "mfp";
    pub const BEACON_TYPE: &str = "beacon_type";
    pub const ENCRYPTION_MODES: &str = "encryption_modes";
    pub const AUTH_MODE: &str = "auth_mode";

    // Collections used by discovery.
    pub const WIFI_RADIOS: &str = "wifi.radios";
    pub const WIFI_SSIDS: &str = "wifi.ssids";
    pub const WIFI_ACCESS_POINTS: &str = "wifi.access_points";
    pub const WIFI_WLAN_CONFIGS: &str = "wifi.wlan_configs";

    // Per-instance discovery fields.
    pub const RADIO_OPERATING_BAND: &str = "wifi.radio.operating_band";
    pub const RADIO_CHANNEL: &str = "wifi.radio.channel";
    pub const RADIO_POSSIBLE_CHANNELS: &str = "wifi.radio.possible_channels";

    // Device information.
    pub const FIRMWARE_VERSION: &str = "device.firmware_version";
    pub const HARDWARE_VERSION: &str = "device.hardware_version";

    // WAN.
    pub const WAN_IP_ADDRESS: &str = "wan.ip_address";
    pub const WAN_STATUS: &str = "wan.status";
    pub const PPPOE_ENABLE: &str = "wan.pppoe.enable";
    pub const PPPOE_USERNAME: &str = "wan.pppoe.username";
    pub const PPPOE_PASSWORD: &str = "wan.pppoe.password";
    pub const PPPOE_CONNECTION_TYPE: &str = "wan.pppoe.connection_type";
    pub const PPPOE_VLAN_ID: &str = "wan.pppoe.vlan_id";
    pub const PPPOE_VLAN_COS: &str = "wan.pppoe.vlan_cos";
    pub const DHCP_ENABLE: &str = "wan.dhcp.enable";
    pub const DHCP_CONNECTION_TYPE: &str = "wan.dhcp.connection_type";
    pub const DHCP_ADDRESSING_TYPE: &str = "wan.dhcp.addressing_type";

    // VoIP.
    pub const VOIP_PROXY_SERVER: &str = "voip.proxy_server";
    pub const VOIP_PROXY_PORT: &str = "voip.proxy_port";
    pub const VOIP_REGISTRAR_SERVER: &str = "voip.registrar_server";
    pub const VOIP_REGISTRAR_PORT: &str = "voip.registrar_port";
    pub const VOIP_LINE_ENABLE: &str = "voip.line_enable";
    pub const VOIP_AUTH_USERNAME: &str = "voip.auth_username";
    pub const VOIP_AUTH_PASSWORD: &str = "voip.auth_password";
    pub const VOIP_URI: &str = "voip.uri";

    // Port forwarding.
    pub const PORT_MAPPINGS_IP: &str = "port_forward.ip";
    pub const PORT_MAPPINGS_PPP: &str = "port_forward.ppp";
    pub const PORT_MAPPING_ENABLE: &str = "port_forward.rule.enable";
    pub const PORT_MAPPING_EXTERNAL_PORT: &str = "port_forward.rule.external_port";
    pub const PORT_MAPPING_INTERNAL_PORT: &str = "port_forward.rule.internal_port";
    pub const PORT_MAPPING_INTERNAL_CLIENT: &str = "port_forward.rule.internal_client";
    pub const PORT_MAPPING_PROTOCOL: &str = "port_forward.rule.protocol";
    pub const PORT_MAPPING_DESCRIPTION: &str = "port_forward.rule.description";

    // Optical diagnostics.
    pub const OPTICAL_RX_POWER: &str = "optical.rx_power";
    pub const OPTICAL_TEMPERATURE: &str = "optical.temperature";

    // Management server.
    pub const PERIODIC_INFORM_ENABLE: &str = "management.periodic_inform_enable";
    pub const PERIODIC_INFORM_INTERVAL: &str = "management.periodic_inform_interval";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_scope_handles_dotted_band() {
        let key = CapabilityKey::new("wifi.band.2.4.ssid");
        assert_eq!(
            key.scope(),
            KeyScope::Band {
                band: Band::TwoPointFour,
                attr: "ssid"
            }
        );
        assert_eq!(key.registry_key(), "wifi.band.{band}.ssid");
    }

    #[test]
    fn device_scope_for_plain_keys() {
        assert_eq!(CapabilityKey::new("wan.status").scope(), KeyScope::Device);
        assert_eq!(
            CapabilityKey::new("wifi.band.7.ssid").scope(),
            KeyScope::Device
        );
        assert_eq!(CapabilityKey::new("wifi.band.5.").scope(), KeyScope::Device);
    }

    #[test]
    fn band_constructor_round_trips_scope() {
        let key = CapabilityKey::band(Band::Six, keys::PASSWORD);
        assert_eq!(key.as_str(), "wifi.band.6.password");
        assert!(matches!(key.scope(), KeyScope::Band { band: Band::Six, .. }));
    }
}
