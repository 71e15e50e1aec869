#![allow(clippy::unwrap_used)]

// Integration tests for `MemoryStore` through the `ParameterStore` trait.

use ontctl_api::{
    Error, Freshness, MemoryStore, ParamValue, ParameterStore, ReadResult, WriteErrorKind,
};
use pretty_assertions::assert_eq;

const WLAN: &str = "InternetGatewayDevice.LANDevice.1.WLANConfiguration";

fn legacy_store() -> MemoryStore {
    MemoryStore::from_json(
        r#"{
            "asOf": 1,
            "parameters": {
                "DeviceID.Manufacturer": "ZTE",
                "InternetGatewayDevice.LANDevice.1.WLANConfiguration.1.SSID": "home",
                "InternetGatewayDevice.LANDevice.1.WLANConfiguration.1.Channel": 6,
                "InternetGatewayDevice.LANDevice.1.WLANConfiguration.2.SSID": "home-5g",
                "InternetGatewayDevice.LANDevice.1.WLANConfiguration.10.SSID": "guest"
            },
            "readOnly": ["DeviceID.Manufacturer"]
        }"#,
    )
    .unwrap()
}

// ── Probing and reading ─────────────────────────────────────────────

#[tokio::test]
async fn probe_finds_parameters_and_objects() {
    let store = legacy_store();
    assert!(store.probe(&format!("{WLAN}.1.SSID")).await.unwrap());
    assert!(store.probe(&format!("{WLAN}.1")).await.unwrap());
    assert!(!store.probe(&format!("{WLAN}.3")).await.unwrap());
    assert!(!store.probe("Device.DeviceInfo.Manufacturer").await.unwrap());
    assert_eq!(store.stats().probes, 4);
}

#[tokio::test]
async fn read_reports_missing_and_objects() {
    let store = legacy_store();
    assert_eq!(
        store.read(&format!("{WLAN}.1.Channel")).await.unwrap(),
        ReadResult::present("6")
    );
    let object = store.read(&format!("{WLAN}.2")).await.unwrap();
    assert!(object.exists);
    assert_eq!(object.value, None);
    assert_eq!(
        store.read("Device.Nope").await.unwrap(),
        ReadResult::missing()
    );
}

#[tokio::test]
async fn list_instances_is_numeric_ascending() {
    let store = legacy_store();
    let listed = store.list_instances(&format!("{WLAN}.*")).await.unwrap();
    assert_eq!(
        listed,
        vec![
            format!("{WLAN}.1"),
            format!("{WLAN}.2"),
            format!("{WLAN}.10"),
        ]
    );
}

#[tokio::test]
async fn list_instances_rejects_bare_path() {
    let store = legacy_store();
    let err = store.list_instances(WLAN).await.unwrap_err();
    assert!(matches!(err, Error::InvalidPath { .. }));
}

// ── Cache and freshness ─────────────────────────────────────────────

#[tokio::test]
async fn live_change_leaves_cache_stale_until_read() {
    let store = legacy_store();
    let path = format!("{WLAN}.1.SSID");

    store.advance_clock();
    store.set_live(&path, "changed");

    let cached = store.observed(&path).await.unwrap().unwrap();
    assert_eq!(cached.value.as_deref(), Some("home"));
    assert_eq!(cached.freshness, Freshness(1));

    store.read(&path).await.unwrap();
    let cached = store.observed(&path).await.unwrap().unwrap();
    assert_eq!(cached.value.as_deref(), Some("changed"));
    assert_eq!(cached.freshness, Freshness(2));
}

// ── Writes and instance creation ────────────────────────────────────

#[tokio::test]
async fn write_updates_live_value_and_cache() {
    let store = legacy_store();
    let path = format!("{WLAN}.1.KeyPassphrase");
    let result = store.write(&path, &ParamValue::secret("s3cret!")).await.unwrap();
    assert!(result.ok);
    assert_eq!(store.value(&path).as_deref(), Some("s3cret!"));
    assert_eq!(
        store.observed(&path).await.unwrap().unwrap().value.as_deref(),
        Some("s3cret!")
    );
}

#[tokio::test]
async fn refused_write_is_a_result_not_an_error() {
    let store = legacy_store();
    let result = store
        .write("DeviceID.Manufacturer", &ParamValue::text("Other"))
        .await
        .unwrap();
    assert!(!result.ok);
    assert_eq!(result.error_kind, Some(WriteErrorKind::NotWritable));
    assert_eq!(store.value("DeviceID.Manufacturer").as_deref(), Some("ZTE"));
}

#[tokio::test]
async fn create_instance_appends_after_highest_index() {
    let store = legacy_store();
    assert_eq!(store.create_instance(WLAN).await.unwrap(), 11);
    assert!(store.probe(&format!("{WLAN}.11")).await.unwrap());
    assert_eq!(store.create_instance("Device.NAT.PortMapping").await.unwrap(), 1);
}

// ── Session failures ────────────────────────────────────────────────

#[tokio::test]
async fn offline_store_fails_every_operation() {
    let store = legacy_store();
    store.set_offline(true);
    let err = store.probe("DeviceID.Manufacturer").await.unwrap_err();
    assert!(err.is_transient());
    assert!(store.read("DeviceID.Manufacturer").await.is_err());
    assert!(store.set_tag("zte", true).await.is_err());
}

#[tokio::test]
async fn faulted_probe_reports_the_code() {
    let store = legacy_store();
    store.fail_probes("DeviceID.Manufacturer", 9005);
    let err = store.probe("DeviceID.Manufacturer").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(!err.is_transient());
    assert!(store.probe("DeviceID.ProductClass").await.is_ok());
}

// ── Snapshot files ──────────────────────────────────────────────────

#[tokio::test]
async fn snapshot_file_survives_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("ont.json");

    let store = legacy_store();
    store.set_tag("zte", true).await.unwrap();
    store.log("inventory line");
    store.save(&file).unwrap();

    let loaded = MemoryStore::load(&file).unwrap();
    assert_eq!(loaded.value(&format!("{WLAN}.10.SSID")).as_deref(), Some("guest"));
    assert_eq!(loaded.tags().get("zte"), Some(&true));
    let refused = loaded
        .write("DeviceID.Manufacturer", &ParamValue::text("x"))
        .await
        .unwrap();
    assert!(!refused.ok);
    assert_eq!(store.logs(), vec!["inventory line".to_owned()]);
}
