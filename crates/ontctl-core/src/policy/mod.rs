// ── Policy validation ──
//
// Parses an intent document into a typed `ReconciliationIntent`. Every
// problem is reported as a `PolicyError` naming the offending field; only
// the intents that depend on that field are dropped.

mod fields;

use std::collections::BTreeMap;

use ontctl_api::Freshness;
use secrecy::SecretString;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::model::{
    Band, BandIntent, ManagementIntent, OpticalThresholds, PortForwardIntent, PortRule,
    ReconciliationIntent, SecurityMode, VoipIntent, WanConnectionKind, WanIntent,
};

use fields::Fields;

const DEFAULT_SIP_PORT: u16 = 5060;
const MAX_VLAN_ID: u64 = 4094;
const MAX_VLAN_COS: u64 = 7;

/// A missing or malformed policy field.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{field}: {reason}")]
pub struct PolicyError {
    /// Dotted location in the document, e.g. `wifi.bands.5.ssid`.
    pub field: String,
    pub reason: String,
}

impl PolicyError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<PolicyError> for CoreError {
    fn from(err: PolicyError) -> Self {
        CoreError::Policy {
            field: err.field,
            reason: err.reason,
        }
    }
}

/// Validation output: whatever intent survived, plus every problem found.
#[derive(Debug, Clone)]
pub struct ValidatedPolicy {
    pub intent: ReconciliationIntent,
    pub errors: Vec<PolicyError>,
}

impl ValidatedPolicy {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a raw JSON document. Unparseable input yields an empty intent
/// and a single error.
pub fn validate_str(raw: &str, config: &EngineConfig) -> ValidatedPolicy {
    match serde_json::from_str::<Value>(raw) {
        Ok(doc) => validate(&doc, config),
        Err(e) => ValidatedPolicy {
            intent: empty_intent(config),
            errors: vec![PolicyError::new("$", format!("invalid JSON: {e}"))],
        },
    }
}

/// Validate a parsed document.
pub fn validate(doc: &Value, config: &EngineConfig) -> ValidatedPolicy {
    let mut errors = Vec::new();
    let mut intent = empty_intent(config);

    let Some(obj) = doc.as_object() else {
        errors.push(PolicyError::new("$", "expected a JSON object"));
        return ValidatedPolicy { intent, errors };
    };
    let section = |name: &str| obj.get(name).filter(|v| !v.is_null());

    if let Some(raw) = section("asOf") {
        match raw.as_u64() {
            Some(n) => intent.as_of = Freshness(n),
            None => errors.push(PolicyError::new(
                "asOf",
                "expected a non-negative integer",
            )),
        }
    }

    let wifi = section("wifi");
    let wan = section("wan");
    let voip = section("voip");
    let port_forward = section("portForward");
    let optical = section("optical");
    let management = section("management");

    if let Some(value) = wifi {
        intent.wifi = validate_wifi(value, &mut errors);
    }
    if let Some(value) = wan {
        intent.wan = validate_wan(value, &mut errors);
    }
    if let Some(value) = voip {
        intent.voip = validate_voip(value, &mut errors);
    }
    if let Some(value) = port_forward {
        intent.port_forward = validate_port_forward(value, config, &mut errors);
    }
    if let Some(value) = optical {
        intent.optical = validate_optical(value, config.optical, &mut errors);
    }
    if let Some(value) = management {
        intent.management = validate_management(value, &mut errors);
    }

    for err in &errors {
        debug!(field = %err.field, reason = %err.reason, "policy field rejected");
    }
    ValidatedPolicy { intent, errors }
}

fn empty_intent(config: &EngineConfig) -> ReconciliationIntent {
    ReconciliationIntent {
        optical: Some(config.optical),
        ..ReconciliationIntent::default()
    }
}

// ── WiFi ────────────────────────────────────────────────────────────

fn validate_wifi(value: &Value, errors: &mut Vec<PolicyError>) -> BTreeMap<Band, BandIntent> {
    let mut out = BTreeMap::new();
    let Some(mut wifi) = Fields::new("wifi", value, errors) else {
        return out;
    };
    let shared_password = wifi.opt_str("password");
    let Some(bands) = wifi.raw("bands") else {
        wifi.error("bands", "required");
        return out;
    };
    let Value::Object(bands) = bands else {
        wifi.error("bands", "expected an object keyed by band");
        return out;
    };

    for (name, body) in bands {
        let Ok(band) = name.parse::<Band>() else {
            wifi.error(
                &format!("bands.{name}"),
                "unknown band, expected \"2.4\", \"5\" or \"6\"",
            );
            continue;
        };
        let shared = shared_password
            .as_ref()
            .map(Option::as_deref)
            .map_err(|_| ());
        if let Some(intent) = validate_band(band, body, shared, wifi.errors()) {
            out.insert(band, intent);
        }
    }
    out
}

fn validate_band(
    band: Band,
    value: &Value,
    shared_password: Result<Option<&str>, ()>,
    errors: &mut Vec<PolicyError>,
) -> Option<BandIntent> {
    let mut f = Fields::new(format!("wifi.bands.{band}"), value, errors)?;

    let ssid = f.req_str("ssid");
    let security = f.opt_enum::<SecurityMode>("security", "wpa2, wpa2-wpa3, wpa3");
    let enabled = f.opt_bool("enabled");
    let password = match f.opt_str("password") {
        Ok(Some(p)) => Some(p),
        Ok(None) => match shared_password {
            Ok(Some(p)) => Some(p.to_owned()),
            Ok(None) => {
                f.error("password", "no band password and no shared wifi.password");
                None
            }
            // Already reported against wifi.password.
            Err(()) => None,
        },
        Err(()) => None,
    };

    // 6 GHz only carries wpa3, so a bad override there costs nothing.
    let security = if band == Band::Six {
        match security {
            Ok(Some(SecurityMode::Wpa3) | None) => {}
            Ok(Some(requested)) => debug!(%requested, "6 GHz security forced to wpa3"),
            Err(()) => debug!("6 GHz security override unreadable, using wpa3"),
        }
        Ok(Some(SecurityMode::Wpa3))
    } else {
        security
    };

    let (Some(ssid), Ok(security), Ok(enabled), Some(password)) =
        (ssid, security, enabled, password)
    else {
        return None;
    };
    let security = security.unwrap_or_default();

    Some(BandIntent {
        ssid,
        password: SecretString::from(password),
        security,
        enabled: enabled.unwrap_or(true),
    })
}

// ── WAN ─────────────────────────────────────────────────────────────

fn validate_wan(value: &Value, errors: &mut Vec<PolicyError>) -> Option<WanIntent> {
    let mut f = Fields::new("wan", value, errors)?;
    let kind = f.req_str("type")?;

    match kind.to_lowercase().as_str() {
        "dhcp" => Some(WanIntent::Dhcp),
        "pppoe" => {
            let username = f.req_str("username");
            let password = f.req_str("password");
            let vlan = f.opt_uint("vlan", MAX_VLAN_ID);
            let cos = f.opt_uint("cos", MAX_VLAN_COS);
            let (Some(username), Some(password), Ok(vlan), Ok(cos)) =
                (username, password, vlan, cos)
            else {
                return None;
            };
            Some(WanIntent::Pppoe {
                username,
                password: SecretString::from(password),
                vlan: vlan.and_then(|v| u16::try_from(v).ok()),
                cos: cos.and_then(|c| u8::try_from(c).ok()).unwrap_or(0),
            })
        }
        other => {
            f.error("type", format!("'{other}' is not one of pppoe, dhcp"));
            None
        }
    }
}

// ── VoIP ────────────────────────────────────────────────────────────

fn validate_voip(value: &Value, errors: &mut Vec<PolicyError>) -> Option<VoipIntent> {
    let mut f = Fields::new("voip", value, errors)?;
    let server = f.req_str("server");
    let username = f.req_str("username");
    let password = f.req_str("password");
    let port = f.opt_port("port");
    let registrar_port = f.opt_port("registrarPort");

    let (Some(server), Some(username), Some(password), Ok(port), Ok(registrar_port)) =
        (server, username, password, port, registrar_port)
    else {
        return None;
    };
    let port = port.unwrap_or(DEFAULT_SIP_PORT);
    Some(VoipIntent {
        server,
        port,
        registrar_port: registrar_port.unwrap_or(port),
        username,
        password: SecretString::from(password),
    })
}

// ── Port forwarding ─────────────────────────────────────────────────

fn validate_port_forward(
    value: &Value,
    config: &EngineConfig,
    errors: &mut Vec<PolicyError>,
) -> Option<PortForwardIntent> {
    let mut f = Fields::new("portForward", value, errors)?;
    let wan = f
        .opt_enum::<WanConnectionKind>("wanType", "ip, ppp")
        .ok()?
        .unwrap_or(config.port_forward_wan);

    let rules = match f.raw("rules") {
        Some(Value::Array(rules)) if !rules.is_empty() => rules,
        Some(Value::Array(_)) | None => {
            f.error("rules", "at least one rule is required");
            return None;
        }
        Some(_) => {
            f.error("rules", "expected an array");
            return None;
        }
    };

    let valid: Vec<PortRule> = rules
        .iter()
        .enumerate()
        .filter_map(|(i, rule)| validate_rule(i, rule, f.errors()))
        .collect();

    if valid.is_empty() {
        return None;
    }
    Some(PortForwardIntent { rules: valid, wan })
}

fn validate_rule(index: usize, value: &Value, errors: &mut Vec<PolicyError>) -> Option<PortRule> {
    let mut f = Fields::new(format!("portForward.rules[{index}]"), value, errors)?;
    let external_port = f.req_port("externalPort");
    let internal_port = f.req_port("internalPort");
    let internal_client = f.req_str("internalClient");
    let protocol = f.opt_str("protocol");
    let description = f.opt_str("description");

    let (Some(external_port), Some(internal_port), Some(internal_client), Ok(protocol), Ok(description)) =
        (external_port, internal_port, internal_client, protocol, description)
    else {
        return None;
    };
    Some(PortRule {
        external_port,
        internal_port,
        internal_client,
        protocol: protocol.map_or_else(|| "TCP".to_owned(), |p| p.to_uppercase()),
        description: description.unwrap_or_default(),
    })
}

// ── Optical ─────────────────────────────────────────────────────────

fn validate_optical(
    value: &Value,
    defaults: OpticalThresholds,
    errors: &mut Vec<PolicyError>,
) -> Option<OpticalThresholds> {
    let f = Fields::new("optical", value, errors)?;
    let Some(thresholds) = f.raw("thresholds") else {
        return Some(defaults);
    };

    let mut t = Fields::new("optical.thresholds", thresholds, errors)?;
    let warning = t.opt_f64("warning");
    let critical = t.opt_f64("critical");
    let (Ok(warning), Ok(critical)) = (warning, critical) else {
        return None;
    };
    Some(OpticalThresholds {
        warning: warning.unwrap_or(defaults.warning),
        critical: critical.unwrap_or(defaults.critical),
    })
}

// ── Management ──────────────────────────────────────────────────────

fn validate_management(value: &Value, errors: &mut Vec<PolicyError>) -> Option<ManagementIntent> {
    let f = Fields::new("management", value, errors)?;
    let inform = f.raw("periodicInform")?;

    let mut p = Fields::new("management.periodicInform", inform, errors)?;
    let enabled = p.opt_bool("enabled");
    let interval = p.opt_uint("interval", u64::from(u32::MAX));
    let (Ok(enabled), Ok(interval)) = (enabled, interval) else {
        return None;
    };
    let defaults = ManagementIntent::default();
    let interval = interval
        .and_then(|i| u32::try_from(i).ok())
        .unwrap_or(defaults.periodic_inform_interval);
    if interval == 0 {
        p.error("interval", "must be at least 1 second");
        return None;
    }
    Some(ManagementIntent {
        periodic_inform_enabled: enabled.unwrap_or(defaults.periodic_inform_enabled),
        periodic_inform_interval: interval,
    })
}
