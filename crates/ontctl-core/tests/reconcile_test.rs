#![allow(clippy::unwrap_used)]

// End-to-end reconciliation against the in-memory store.

use ontctl_api::{MemoryStore, ParamValue, WriteErrorKind};
use ontctl_core::{
    CapabilityKey, CoreError, EngineConfig, NoticeKind, OutcomeStatus, Reconciler, keys,
    validate,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

const WLAN: &str = "InternetGatewayDevice.LANDevice.1.WLANConfiguration";
const WAN_CONN: &str = "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1";
const PORT_MAPPING: &str =
    "InternetGatewayDevice.WANDevice.1.WANConnectionDevice.1.WANIPConnection.1.PortMapping";

// ── Fixtures ────────────────────────────────────────────────────────

/// Legacy-schema device with a 2.4 GHz WLAN at index 1 and 5 GHz at 5.
fn legacy_device(manufacturer: &str) -> MemoryStore {
    let store = MemoryStore::new();
    store.set("DeviceID.Manufacturer", manufacturer);
    store.set("DeviceID.ProductClass", "F670L");
    store.set("DeviceID.SerialNumber", "ZTEGC0FFEE01");
    store.set("InternetGatewayDevice.DeviceInfo.SoftwareVersion", "V9.0.10P1N2");

    for (index, channels) in [(1, "1-13"), (5, "36,40,44,48")] {
        let wlan = format!("{WLAN}.{index}");
        store.set(&format!("{wlan}.Channel"), "0");
        store.set(&format!("{wlan}.PossibleChannels"), channels);
        store.set(&format!("{wlan}.SSID"), "factory");
        store.set(&format!("{wlan}.KeyPassphrase"), "factorypass");
        store.set(&format!("{wlan}.Enable"), "1");
        store.set(&format!("{wlan}.BeaconType"), "Basic");
        store.set(&format!("{wlan}.WPAEncryptionModes"), "TKIPEncryption");
        store.set(&format!("{wlan}.WPAAuthenticationMode"), "PSKAuthentication");
    }

    let ppp = format!("{WAN_CONN}.WANPPPConnection.1");
    store.set(&format!("{ppp}.Enable"), "0");
    store.set(&format!("{ppp}.Username"), "");
    store.set(&format!("{ppp}.Password"), "");
    store.set(&format!("{ppp}.ConnectionType"), "Unconfigured");
    store.set(&format!("{WAN_CONN}.X_ZTE-COM_VLANID"), "0");
    store.set(&format!("{WAN_CONN}.X_HW_VLANMuxID"), "0");
    store.set(&format!("{WAN_CONN}.X_HW_VLAN_CoS"), "0");
    store.add_object(PORT_MAPPING);
    store.set(
        "InternetGatewayDevice.WANDevice.1.X_ZTE-COM_GponInterfaceConfig.RxPower",
        "-18.2",
    );

    store.set(
        "InternetGatewayDevice.ManagementServer.PeriodicInformEnable",
        "0",
    );
    store.set(
        "InternetGatewayDevice.ManagementServer.PeriodicInformInterval",
        "86400",
    );
    store
}

/// Unified-schema device; `radios` lists (index, OperatingFrequencyBand),
/// SSID and AccessPoint siblings are created for `aligned` indices only.
fn unified_device(radios: &[(u32, &str)], aligned: &[u32]) -> MemoryStore {
    let store = MemoryStore::new();
    store.set("DeviceID.Manufacturer", "ALCL");
    store.set("DeviceID.ProductClass", "G-2425G-A");
    store.set("DeviceID.SerialNumber", "ALCLB1234567");
    store.set("Device.DeviceInfo.Manufacturer", "Nokia");
    store.set("Device.DeviceInfo.SoftwareVersion", "3FE49568IJHK11");
    for (index, band) in radios {
        store.set(&format!("Device.WiFi.Radio.{index}.OperatingFrequencyBand"), *band);
    }
    for index in aligned {
        store.set(&format!("Device.WiFi.SSID.{index}.SSID"), "factory");
        store.set(&format!("Device.WiFi.SSID.{index}.Enable"), "true");
        let security = format!("Device.WiFi.AccessPoint.{index}.Security");
        store.set(&format!("{security}.KeyPassphrase"), "factorypass");
        store.set(&format!("{security}.ModeEnabled"), "WPA2-Personal");
        store.set(&format!("{security}.MFPConfig"), "Disabled");
    }
    store
}

fn policy() -> Value {
    json!({
        "wifi": {
            "password": "correct horse",
            "bands": {
                "2.4": { "ssid": "Home" },
                "5": { "ssid": "Home-5G", "security": "wpa3" }
            }
        },
        "wan": { "type": "pppoe", "username": "user@isp", "password": "s3cret", "vlan": 35 },
        "portForward": {
            "rules": [{ "externalPort": 8080, "internalPort": 80, "internalClient": "192.168.1.10" }]
        },
        "management": { "periodicInform": {} }
    })
}

fn engine() -> Reconciler {
    Reconciler::new(EngineConfig::default())
}

fn add_mapping(store: &MemoryStore, index: u32, external: u16) {
    let base = format!("{PORT_MAPPING}.{index}");
    store.set(&format!("{base}.ExternalPort"), external.to_string());
    store.set(&format!("{base}.PortMappingProtocol"), "TCP");
}

/// A complete mapping forwarding `external` to `client:internal`.
fn add_forward(store: &MemoryStore, index: u32, external: u16, internal: u16, client: &str) {
    add_mapping(store, index, external);
    let base = format!("{PORT_MAPPING}.{index}");
    store.set(&format!("{base}.PortMappingEnabled"), "1");
    store.set(&format!("{base}.InternalPort"), internal.to_string());
    store.set(&format!("{base}.InternalClient"), client);
}

// ── Convergence ─────────────────────────────────────────────────────

#[tokio::test]
async fn second_run_is_idempotent() {
    let store = legacy_device("ZTE Corp.");
    let engine = engine();

    let report = engine.run(&store, &policy()).await.unwrap();
    assert!(report.is_clean(), "failures: {:?}", report.failures().collect::<Vec<_>>());
    assert!(report.written() > 0);
    assert_eq!(
        store.value(&format!("{WLAN}.5.WPAAuthenticationMode")).as_deref(),
        Some("SAEAuthentication")
    );
    assert_eq!(
        store.value(&format!("{WAN_CONN}.X_ZTE-COM_VLANID")).as_deref(),
        Some("35")
    );

    let second = engine
        .plan_policy(&store, &engine.validate(&policy()))
        .await
        .unwrap();
    assert!(second.is_converged(), "directives: {:?}", second.directives);
    assert!(second.notices.is_empty(), "notices: {:?}", second.notices);
}

#[tokio::test]
async fn secrets_never_carry_current_values() {
    let store = legacy_device("ZTE");
    let plan = engine()
        .plan_policy(&store, &engine().validate(&policy()))
        .await
        .unwrap();

    let password = plan.directive("wifi.band.2.4.password").unwrap();
    assert_eq!(password.path, format!("{WLAN}.1.KeyPassphrase"));
    assert!(password.current.is_none());
    assert!(password.value.is_secret());

    let ssid = plan.directive("wifi.band.2.4.ssid").unwrap();
    assert_eq!(ssid.current.as_deref(), Some("factory"));

    let rendered = serde_json::to_string(&plan).unwrap();
    assert!(!rendered.contains("correct horse"));
    assert!(!rendered.contains("s3cret"));
}

#[tokio::test]
async fn stale_cache_is_reread() {
    let store = legacy_device("ZTE");
    store.set(&format!("{WLAN}.1.SSID"), "Home");
    let as_of = store.advance_clock();
    store.set_live(&format!("{WLAN}.1.SSID"), "Changed-behind-cache");

    let doc = json!({
        "wifi": { "password": "correct horse", "bands": { "2.4": { "ssid": "Home" } } }
    });

    // Cache accepted: the stale "Home" looks in sync.
    let plan = engine()
        .plan_policy(&store, &engine().validate(&doc))
        .await
        .unwrap();
    assert!(plan.directive("wifi.band.2.4.ssid").is_none());

    // Cache too old for the policy: the live value is read and differs.
    let mut doc = doc;
    doc["asOf"] = json!(as_of.0);
    let plan = engine()
        .plan_policy(&store, &engine().validate(&doc))
        .await
        .unwrap();
    let ssid = plan.directive("wifi.band.2.4.ssid").unwrap();
    assert_eq!(ssid.current.as_deref(), Some("Changed-behind-cache"));
}

// ── Port forwarding ─────────────────────────────────────────────────

#[tokio::test]
async fn new_rule_appends_after_highest_index() {
    let store = legacy_device("ZTE");
    for (index, port) in [(1, 1001), (2, 1002), (3, 1003)] {
        add_mapping(&store, index, port);
    }
    let doc = json!({
        "portForward": { "rules": [{ "externalPort": 8080, "internalPort": 80, "internalClient": "10.0.0.2" }] }
    });

    let plan = engine()
        .plan_policy(&store, &engine().validate(&doc))
        .await
        .unwrap();
    let external = plan.directive(keys::PORT_MAPPING_EXTERNAL_PORT).unwrap();
    assert_eq!(external.path, format!("{PORT_MAPPING}.4.ExternalPort"));
    assert!(!external.existed_before);
    assert_eq!(external.instance.as_ref().map(|i| i.index), Some(4));
    assert_eq!(
        plan.directive(keys::PORT_MAPPING_PROTOCOL).unwrap().path,
        format!("{PORT_MAPPING}.4.PortMappingProtocol")
    );

    // Removing a middle rule never reuses its index.
    store.remove(&format!("{PORT_MAPPING}.2"));
    let plan = engine()
        .plan_policy(&store, &engine().validate(&doc))
        .await
        .unwrap();
    let external = plan.directive(keys::PORT_MAPPING_EXTERNAL_PORT).unwrap();
    assert_eq!(external.path, format!("{PORT_MAPPING}.4.ExternalPort"));

    let report = engine().apply(&store, plan).await;
    assert!(report.is_clean());
    assert_eq!(store.stats().creates, 1);
    assert_eq!(
        store.value(&format!("{PORT_MAPPING}.4.InternalClient")).as_deref(),
        Some("10.0.0.2")
    );
}

#[tokio::test]
async fn existing_rule_is_not_duplicated() {
    let store = legacy_device("ZTE");
    add_forward(&store, 1, 8080, 80, "10.0.0.2");
    let doc = json!({
        "portForward": { "rules": [
            { "externalPort": 8080, "internalPort": 80, "internalClient": "10.0.0.2", "protocol": "tcp" },
            { "externalPort": 8443, "internalPort": 443, "internalClient": "10.0.0.2" },
            { "externalPort": 8443, "internalPort": 443, "internalClient": "10.0.0.3" }
        ] }
    });

    let plan = engine()
        .plan_policy(&store, &engine().validate(&doc))
        .await
        .unwrap();
    assert!(plan.in_sync.iter().any(|k| k.as_str() == keys::PORT_MAPPINGS_IP));
    assert_eq!(plan.notices.len(), 1);
    assert_eq!(plan.notices[0].kind, NoticeKind::DuplicateRule);

    let externals: Vec<_> = plan
        .directives
        .iter()
        .filter(|d| d.capability.as_str() == keys::PORT_MAPPING_EXTERNAL_PORT)
        .collect();
    assert_eq!(externals.len(), 1);
    assert_eq!(externals[0].value, ParamValue::UInt(8443));
    assert_eq!(externals[0].path, format!("{PORT_MAPPING}.2.ExternalPort"));
    assert!(
        plan.directives
            .iter()
            .all(|d| !d.path.starts_with(&format!("{PORT_MAPPING}.1.")))
    );
}

#[tokio::test]
async fn retargeted_rule_rewrites_existing_mapping() {
    let store = legacy_device("ZTE");
    add_forward(&store, 1, 8080, 22, "192.168.1.5");
    let doc = json!({
        "portForward": { "rules": [
            { "externalPort": 8080, "internalPort": 80, "internalClient": "10.0.0.2", "protocol": "tcp" }
        ] }
    });

    let plan = engine()
        .plan_policy(&store, &engine().validate(&doc))
        .await
        .unwrap();
    assert!(!plan.in_sync.iter().any(|k| k.as_str() == keys::PORT_MAPPINGS_IP));
    assert!(plan.directive(keys::PORT_MAPPING_EXTERNAL_PORT).is_none());
    assert!(plan.directive(keys::PORT_MAPPING_ENABLE).is_none());

    let port = plan.directive(keys::PORT_MAPPING_INTERNAL_PORT).unwrap();
    assert_eq!(port.path, format!("{PORT_MAPPING}.1.InternalPort"));
    assert_eq!(port.value, ParamValue::UInt(80));
    assert_eq!(port.current.as_deref(), Some("22"));
    assert!(port.existed_before);
    assert!(port.instance.is_none());

    let client = plan.directive(keys::PORT_MAPPING_INTERNAL_CLIENT).unwrap();
    assert_eq!(client.path, format!("{PORT_MAPPING}.1.InternalClient"));
    assert_eq!(client.current.as_deref(), Some("192.168.1.5"));

    let report = engine().apply(&store, plan).await;
    assert!(report.is_clean());
    assert_eq!(store.stats().creates, 0);
    assert_eq!(
        store.value(&format!("{PORT_MAPPING}.1.InternalClient")).as_deref(),
        Some("10.0.0.2")
    );

    let plan = engine()
        .plan_policy(&store, &engine().validate(&doc))
        .await
        .unwrap();
    assert!(plan.directives.is_empty(), "directives: {:?}", plan.directives);
    assert!(plan.in_sync.iter().any(|k| k.as_str() == keys::PORT_MAPPINGS_IP));
}

// ── WiFi ────────────────────────────────────────────────────────────

#[tokio::test]
async fn six_ghz_is_always_wpa3() {
    let store = unified_device(&[(1, "2.4GHz"), (2, "5GHz"), (3, "6GHz")], &[1, 2, 3]);
    let doc = json!({
        "wifi": { "password": "correct horse", "bands": { "6": { "ssid": "Six", "security": "wpa2" } } }
    });

    let plan = engine()
        .plan_policy(&store, &engine().validate(&doc))
        .await
        .unwrap();
    let mode = plan.directive("wifi.band.6.security_mode").unwrap();
    assert_eq!(mode.path, "Device.WiFi.AccessPoint.3.Security.ModeEnabled");
    assert_eq!(mode.value, ParamValue::text("WPA3-SAE"));
    assert_eq!(
        plan.directive("wifi.band.6.mfp").unwrap().value,
        ParamValue::text("Required")
    );
    // Legacy-only security parameters do not apply to a unified device.
    assert!(plan.directive("wifi.band.6.beacon_type").is_none());
    assert_eq!(plan.tag("wifi_6ghz"), Some(true));
}

#[tokio::test]
async fn misaligned_radio_is_reported_not_guessed() {
    let store = unified_device(&[(1, "2.4GHz"), (2, "5GHz")], &[1]);
    let doc = json!({
        "wifi": { "password": "correct horse", "bands": { "5": { "ssid": "Five" } } }
    });

    let plan = engine()
        .plan_policy(&store, &engine().validate(&doc))
        .await
        .unwrap();
    assert!(plan.directives.is_empty());
    assert!(
        plan.notices
            .iter()
            .any(|n| n.kind == NoticeKind::Misaligned && n.subject == "wifi.band.5.ssid")
    );
    // The radio exists, so the band still counts as present.
    assert_eq!(plan.tag("wifi_5ghz"), Some(true));
}

// ── Detection and tags ──────────────────────────────────────────────

#[tokio::test]
async fn detection_failure_aborts_before_any_other_call() {
    let store = MemoryStore::new();
    store.set("InternetGatewayDevice.DeviceInfo.SoftwareVersion", "V1");

    let err = engine().run(&store, &policy()).await.unwrap_err();
    assert!(matches!(err, CoreError::Detection { .. }));
    assert!(err.is_fatal());
    let stats = store.stats();
    assert_eq!(stats.writes, 0);
    assert_eq!(stats.probes, 0);
    assert_eq!(stats.lists, 0);
    assert!(store.tags().is_empty());
}

#[tokio::test]
async fn vendor_and_schema_tags() {
    let store = legacy_device("ZTE Corp.");
    let report = engine().run(&store, &json!({})).await.unwrap();
    let tags = store.tags();
    assert_eq!(tags.get("zte"), Some(&true));
    assert_eq!(tags.get("vendor_zte"), Some(&true));
    assert_eq!(tags.get("schema_legacy"), Some(&true));
    assert_eq!(tags.get("schema_unified"), Some(&false));
    assert_eq!(tags.get("F670L"), Some(&true));
    assert_eq!(tags.get("wifi_2_4ghz"), Some(&true));
    assert_eq!(tags.get("wifi_6ghz"), Some(&false));
    assert!(report.plan.directives.is_empty());
    assert!(
        store
            .logs()
            .iter()
            .any(|l| l == "Inventory: ZTE Corp. F670L SN:ZTEGC0FFEE01 FW:V9.0.10P1N2")
    );

    let store = legacy_device("Acme Networks");
    let intent = validate(&json!({}), &EngineConfig::default()).intent;
    let plan = engine().plan(&store, &intent).await.unwrap();
    assert!(plan.device.vendor.is_none());
    assert_eq!(plan.tag("schema_legacy"), Some(true));
    assert!(!plan.tags.iter().any(|t| t.name.starts_with("vendor_")));
}

#[tokio::test]
async fn nokia_firmware_tag() {
    let store = unified_device(&[(1, "2.4GHz")], &[1]);
    let plan = engine()
        .plan_policy(&store, &engine().validate(&json!({})))
        .await
        .unwrap();
    assert_eq!(plan.tag("nokia_firmware_3FE49568IJ"), Some(true));
    assert_eq!(plan.tag("vendor_nokia"), Some(true));
    assert_eq!(plan.tag("G_2425G_A"), Some(true));
}

// ── Optical ─────────────────────────────────────────────────────────

#[tokio::test]
async fn optical_critical_also_raises_warning() {
    let store = legacy_device("ALCL");
    store.set("InternetGatewayDevice.X_ALU_COM.OntOpticalParam.RxPower", "-29.1");
    let plan = engine()
        .plan_policy(&store, &engine().validate(&json!({})))
        .await
        .unwrap();
    assert_eq!(plan.tag("optical_critical"), Some(true));
    assert_eq!(plan.tag("optical_warning"), Some(true));

    store.set("InternetGatewayDevice.X_ALU_COM.OntOpticalParam.RxPower", "-26.0");
    let plan = engine()
        .plan_policy(&store, &engine().validate(&json!({})))
        .await
        .unwrap();
    assert_eq!(plan.tag("optical_critical"), Some(false));
    assert_eq!(plan.tag("optical_warning"), Some(true));
}

#[tokio::test]
async fn optical_custom_thresholds_and_bad_reading() {
    let store = legacy_device("ZTE");
    let rx = "InternetGatewayDevice.WANDevice.1.X_ZTE-COM_GponInterfaceConfig.RxPower";
    store.set(rx, "-20.5");
    let doc = json!({ "optical": { "thresholds": { "warning": -20.0 } } });
    let plan = engine()
        .plan_policy(&store, &engine().validate(&doc))
        .await
        .unwrap();
    assert_eq!(plan.tag("optical_warning"), Some(true));
    assert_eq!(plan.tag("optical_critical"), Some(false));

    store.set(rx, "N/A");
    let plan = engine()
        .plan_policy(&store, &engine().validate(&doc))
        .await
        .unwrap();
    assert_eq!(plan.tag("optical_warning"), None);
    assert_eq!(plan.notices.len(), 1);
    assert_eq!(plan.notices[0].kind, NoticeKind::NumericParse);
}

#[tokio::test]
async fn huawei_has_no_optical_parameter() {
    let store = legacy_device("Huawei Technologies Co., Ltd");
    let plan = engine()
        .plan_policy(&store, &engine().validate(&json!({})))
        .await
        .unwrap();
    assert_eq!(plan.tag("optical_warning"), None);
    assert!(plan.notices.is_empty());
}

// ── WAN ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn vlan_writes_follow_vendor_extensions() {
    let doc = json!({ "wan": { "type": "pppoe", "username": "u", "password": "p", "vlan": 100, "cos": 5 } });

    let store = legacy_device("Huawei");
    let plan = engine()
        .plan_policy(&store, &engine().validate(&doc))
        .await
        .unwrap();
    assert_eq!(
        plan.directive(keys::PPPOE_VLAN_ID).unwrap().path,
        format!("{WAN_CONN}.X_HW_VLANMuxID")
    );
    assert_eq!(
        plan.directive(keys::PPPOE_VLAN_COS).unwrap().value,
        ParamValue::UInt(5)
    );

    let store = legacy_device("ZTE");
    let plan = engine()
        .plan_policy(&store, &engine().validate(&doc))
        .await
        .unwrap();
    assert_eq!(
        plan.directive(keys::PPPOE_VLAN_ID).unwrap().path,
        format!("{WAN_CONN}.X_ZTE-COM_VLANID")
    );
    assert!(plan.directive(keys::PPPOE_VLAN_COS).is_none());

    let store = legacy_device("FiberHome");
    let plan = engine()
        .plan_policy(&store, &engine().validate(&doc))
        .await
        .unwrap();
    assert!(plan.directive(keys::PPPOE_VLAN_ID).is_none());
    assert!(plan.directive(keys::PPPOE_USERNAME).is_some());
}

#[tokio::test]
async fn policy_errors_become_leading_notices() {
    let store = legacy_device("ZTE");
    let doc = json!({
        "wan": { "type": "pppoe", "username": "u" },
        "wifi": { "bands": { "2.4": { "ssid": "Home", "password": "correct horse" } } }
    });
    let report = engine().run(&store, &doc).await.unwrap();
    let first = &report.plan.notices[0];
    assert_eq!(first.kind, NoticeKind::Policy);
    assert_eq!(first.subject, "wan.password");
    assert!(report.plan.directive(keys::PPPOE_USERNAME).is_none());
    assert_eq!(
        store.value(&format!("{WLAN}.1.SSID")).as_deref(),
        Some("Home")
    );
}

// ── Apply ───────────────────────────────────────────────────────────

#[tokio::test]
async fn refused_write_does_not_stop_the_run() {
    let store = legacy_device("ZTE");
    store.reject_writes(&format!("{WLAN}.1.SSID"), WriteErrorKind::NotWritable);

    let report = engine().run(&store, &policy()).await.unwrap();
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].capability.as_str(), "wifi.band.2.4.ssid");
    assert_eq!(
        failures[0].status,
        OutcomeStatus::Rejected {
            kind: WriteErrorKind::NotWritable
        }
    );
    assert_eq!(
        store.value(&format!("{WLAN}.5.SSID")).as_deref(),
        Some("Home-5G")
    );
    assert!(store.logs().iter().any(|l| l.contains("parameter is not writable")));
}

// ── Read-through ────────────────────────────────────────────────────

#[tokio::test]
async fn read_capability_falls_back_across_connections() {
    let store = legacy_device("ZTE");
    store.set(
        &format!("{WAN_CONN}.WANIPConnection.1.ExternalIPAddress"),
        "100.64.7.9",
    );
    let value = engine()
        .read_capability(&store, &CapabilityKey::from(keys::WAN_IP_ADDRESS))
        .await
        .unwrap();
    assert_eq!(value.as_deref(), Some("100.64.7.9"));

    let err = engine()
        .read_capability(&store, &CapabilityKey::from(keys::WAN_STATUS))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::PathNotFound { .. }));
}
