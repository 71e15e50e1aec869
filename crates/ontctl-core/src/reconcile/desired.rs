// Intent → flat list of (capability, value) pairs.
//
// Every schema's attributes are emitted; the registry filters decide which
// ones exist on a given device. Security settings for both data models are
// produced side by side for that reason.

use ontctl_api::ParamValue;
use secrecy::ExposeSecret;

use crate::model::{
    Band, BandIntent, CapabilityKey, ManagementIntent, PortRule, ReconciliationIntent,
    SecurityMode, VoipIntent, WanIntent, keys,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Desired {
    pub key: CapabilityKey,
    pub value: ParamValue,
}

impl Desired {
    fn new(key: impl Into<CapabilityKey>, value: impl Into<ParamValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

pub(crate) fn desired_attributes(intent: &ReconciliationIntent) -> Vec<Desired> {
    let mut out = Vec::new();
    for (band, wifi) in &intent.wifi {
        band_attributes(*band, wifi, &mut out);
    }
    if let Some(wan) = &intent.wan {
        wan_attributes(wan, &mut out);
    }
    if let Some(voip) = &intent.voip {
        voip_attributes(voip, &mut out);
    }
    if let Some(management) = &intent.management {
        management_attributes(management, &mut out);
    }
    out
}

// ── WiFi ────────────────────────────────────────────────────────────

fn band_attributes(band: Band, wifi: &BandIntent, out: &mut Vec<Desired>) {
    let key = |attr: &str| CapabilityKey::band(band, attr);

    out.push(Desired::new(key(keys::SSID), wifi.ssid.as_str()));
    out.push(Desired::new(key(keys::ENABLE), wifi.enabled));

    // Unified security object.
    let (mode, mfp) = match wifi.security {
        SecurityMode::Wpa3 => ("WPA3-SAE", Some("Required")),
        SecurityMode::Wpa2Wpa3 => ("WPA2-PSK-WPA3-SAE", Some("Optional")),
        SecurityMode::Wpa2 => ("WPA2-Personal", None),
    };
    out.push(Desired::new(key(keys::SECURITY_MODE), mode));
    if let Some(mfp) = mfp {
        out.push(Desired::new(key(keys::MFP), mfp));
    }

    // Legacy WLAN security; mixed mode has no legacy form and degrades to WPA2.
    let auth = if wifi.security == SecurityMode::Wpa3 {
        "SAEAuthentication"
    } else {
        "PSKAuthentication"
    };
    out.push(Desired::new(key(keys::BEACON_TYPE), "11i"));
    out.push(Desired::new(key(keys::ENCRYPTION_MODES), "AESEncryption"));
    out.push(Desired::new(key(keys::AUTH_MODE), auth));

    out.push(Desired::new(
        key(keys::PASSWORD),
        ParamValue::secret(wifi.password.expose_secret()),
    ));
}

// ── WAN ─────────────────────────────────────────────────────────────

fn wan_attributes(wan: &WanIntent, out: &mut Vec<Desired>) {
    match wan {
        WanIntent::Pppoe {
            username,
            password,
            vlan,
            cos,
        } => {
            out.push(Desired::new(keys::PPPOE_ENABLE, true));
            out.push(Desired::new(keys::PPPOE_USERNAME, username.as_str()));
            out.push(Desired::new(
                keys::PPPOE_PASSWORD,
                ParamValue::secret(password.expose_secret()),
            ));
            out.push(Desired::new(keys::PPPOE_CONNECTION_TYPE, "IP_Routed"));
            if let Some(vlan) = vlan {
                out.push(Desired::new(keys::PPPOE_VLAN_ID, *vlan));
                out.push(Desired::new(keys::PPPOE_VLAN_COS, u16::from(*cos)));
            }
        }
        WanIntent::Dhcp => {
            out.push(Desired::new(keys::DHCP_ENABLE, true));
            out.push(Desired::new(keys::DHCP_CONNECTION_TYPE, "IP_Routed"));
            out.push(Desired::new(keys::DHCP_ADDRESSING_TYPE, "DHCP"));
        }
    }
}

// ── VoIP ────────────────────────────────────────────────────────────

fn voip_attributes(voip: &VoipIntent, out: &mut Vec<Desired>) {
    out.push(Desired::new(keys::VOIP_PROXY_SERVER, voip.server.as_str()));
    out.push(Desired::new(keys::VOIP_PROXY_PORT, voip.port));
    out.push(Desired::new(keys::VOIP_REGISTRAR_SERVER, voip.server.as_str()));
    out.push(Desired::new(keys::VOIP_REGISTRAR_PORT, voip.registrar_port));
    out.push(Desired::new(keys::VOIP_LINE_ENABLE, "Enabled"));
    out.push(Desired::new(keys::VOIP_AUTH_USERNAME, voip.username.as_str()));
    out.push(Desired::new(
        keys::VOIP_AUTH_PASSWORD,
        ParamValue::secret(voip.password.expose_secret()),
    ));
    out.push(Desired::new(keys::VOIP_URI, voip.username.as_str()));
}

// ── Management ──────────────────────────────────────────────────────

fn management_attributes(management: &ManagementIntent, out: &mut Vec<Desired>) {
    out.push(Desired::new(
        keys::PERIODIC_INFORM_ENABLE,
        management.periodic_inform_enabled,
    ));
    out.push(Desired::new(
        keys::PERIODIC_INFORM_INTERVAL,
        management.periodic_inform_interval,
    ));
}

// ── Port forwarding ─────────────────────────────────────────────────

/// Member fields written into a freshly created port mapping instance.
pub(crate) fn rule_members(rule: &PortRule) -> Vec<Desired> {
    vec![
        Desired::new(keys::PORT_MAPPING_ENABLE, true),
        Desired::new(keys::PORT_MAPPING_EXTERNAL_PORT, rule.external_port),
        Desired::new(keys::PORT_MAPPING_INTERNAL_PORT, rule.internal_port),
        Desired::new(keys::PORT_MAPPING_INTERNAL_CLIENT, rule.internal_client.as_str()),
        Desired::new(keys::PORT_MAPPING_PROTOCOL, rule.protocol.as_str()),
        Desired::new(keys::PORT_MAPPING_DESCRIPTION, rule.description.as_str()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn band(security: SecurityMode) -> BandIntent {
        BandIntent {
            ssid: "Net".into(),
            password: SecretString::from("pass".to_owned()),
            security,
            enabled: true,
        }
    }

    fn value_of<'a>(out: &'a [Desired], key: &str) -> Option<&'a ParamValue> {
        out.iter().find(|d| d.key.as_str() == key).map(|d| &d.value)
    }

    #[test]
    fn wpa3_sets_required_mfp_and_sae() {
        let mut out = Vec::new();
        band_attributes(Band::Six, &band(SecurityMode::Wpa3), &mut out);
        assert_eq!(
            value_of(&out, "wifi.band.6.security_mode"),
            Some(&ParamValue::text("WPA3-SAE"))
        );
        assert_eq!(
            value_of(&out, "wifi.band.6.mfp"),
            Some(&ParamValue::text("Required"))
        );
        assert_eq!(
            value_of(&out, "wifi.band.6.auth_mode"),
            Some(&ParamValue::text("SAEAuthentication"))
        );
    }

    #[test]
    fn wpa2_has_no_mfp_and_mixed_degrades_on_legacy() {
        let mut out = Vec::new();
        band_attributes(Band::Five, &band(SecurityMode::Wpa2), &mut out);
        assert!(value_of(&out, "wifi.band.5.mfp").is_none());

        let mut out = Vec::new();
        band_attributes(Band::Five, &band(SecurityMode::Wpa2Wpa3), &mut out);
        assert_eq!(
            value_of(&out, "wifi.band.5.mfp"),
            Some(&ParamValue::text("Optional"))
        );
        assert_eq!(
            value_of(&out, "wifi.band.5.auth_mode"),
            Some(&ParamValue::text("PSKAuthentication"))
        );
    }

    #[test]
    fn vlan_cos_only_with_vlan() {
        let mut out = Vec::new();
        wan_attributes(
            &WanIntent::Pppoe {
                username: "u".into(),
                password: SecretString::from("p".to_owned()),
                vlan: None,
                cos: 3,
            },
            &mut out,
        );
        assert!(value_of(&out, keys::PPPOE_VLAN_COS).is_none());
        assert!(value_of(&out, keys::PPPOE_PASSWORD).is_some_and(ParamValue::is_secret));
    }

    #[test]
    fn voip_uri_mirrors_username() {
        let mut out = Vec::new();
        voip_attributes(
            &VoipIntent {
                server: "sip.isp.net".into(),
                port: 5060,
                registrar_port: 5070,
                username: "0612345678".into(),
                password: SecretString::from("x".to_owned()),
            },
            &mut out,
        );
        assert_eq!(
            value_of(&out, keys::VOIP_URI),
            Some(&ParamValue::text("0612345678"))
        );
        assert_eq!(
            value_of(&out, keys::VOIP_REGISTRAR_PORT),
            Some(&ParamValue::UInt(5070))
        );
    }
}
