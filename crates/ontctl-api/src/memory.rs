// ── In-memory parameter store ──
//
// Snapshot-backed `ParameterStore` used for offline planning and as the
// test double for the engine. Keeps a live parameter tree plus a cache of
// observations, so stale-cache behaviour can be exercised without a device.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;
use crate::path::{child_index, is_within, pattern_base};
use crate::store::ParameterStore;
use crate::types::{
    Freshness, ObservedParameter, ParamValue, ReadResult, WriteErrorKind, WriteResult,
};

// ── Snapshot format ─────────────────────────────────────────────────

/// JSON form of a device's parameter tree.
///
/// `parameters` maps full paths to scalar values; `null` declares an
/// object node with no value (e.g. an empty collection instance).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    #[serde(default)]
    pub as_of: Freshness,

    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,

    /// Paths that refuse writes.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub read_only: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, bool>,
}

fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

// ── Operation counters ──────────────────────────────────────────────

/// How many store operations a caller issued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpStats {
    pub probes: usize,
    pub reads: usize,
    pub lists: usize,
    pub writes: usize,
    pub creates: usize,
}

#[derive(Default)]
struct OpCounters {
    probes: AtomicUsize,
    reads: AtomicUsize,
    lists: AtomicUsize,
    writes: AtomicUsize,
    creates: AtomicUsize,
}

// ── MemoryStore ─────────────────────────────────────────────────────

/// Thread-safe in-memory parameter tree.
pub struct MemoryStore {
    /// Live device state. `None` marks an object node.
    params: DashMap<String, Option<String>>,
    /// Cached observations, possibly older than `params`.
    cache: DashMap<String, ObservedParameter>,
    /// Paths that refuse writes, with the refusal reported.
    faults: DashMap<String, WriteErrorKind>,
    /// Paths whose probes answer with a fault code.
    probe_faults: DashMap<String, u32>,
    tags: DashMap<String, bool>,
    logs: Mutex<Vec<String>>,
    clock: AtomicU64,
    offline: AtomicBool,
    counters: OpCounters,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            params: DashMap::new(),
            cache: DashMap::new(),
            faults: DashMap::new(),
            probe_faults: DashMap::new(),
            tags: DashMap::new(),
            logs: Mutex::new(Vec::new()),
            clock: AtomicU64::new(0),
            offline: AtomicBool::new(false),
            counters: OpCounters::default(),
        }
    }

    /// Build a store whose live state and cache both equal `snapshot`,
    /// observed at `snapshot.as_of`.
    pub fn from_snapshot(snapshot: DeviceSnapshot) -> Self {
        let store = Self::new();
        store.clock.store(snapshot.as_of.0, Ordering::SeqCst);

        for (path, raw) in snapshot.parameters {
            let value = scalar_to_string(&raw);
            store.cache.insert(
                path.clone(),
                ObservedParameter {
                    path: path.clone(),
                    value: value.clone(),
                    freshness: snapshot.as_of,
                },
            );
            store.params.insert(path, value);
        }
        for path in snapshot.read_only {
            store.faults.insert(path, WriteErrorKind::NotWritable);
        }
        for (name, value) in snapshot.tags {
            store.tags.insert(name, value);
        }
        store
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        let snapshot: DeviceSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Current live state as a snapshot (read-only markers included).
    pub fn to_snapshot(&self) -> DeviceSnapshot {
        let parameters = self
            .params
            .iter()
            .map(|r| {
                let value = r
                    .value()
                    .clone()
                    .map_or(serde_json::Value::Null, serde_json::Value::String);
                (r.key().clone(), value)
            })
            .collect();
        let read_only = self
            .faults
            .iter()
            .filter(|r| *r.value() == WriteErrorKind::NotWritable)
            .map(|r| r.key().clone())
            .collect();

        DeviceSnapshot {
            as_of: self.now(),
            parameters,
            read_only,
            tags: self.tags(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(&self.to_snapshot())?;
        std::fs::write(path, json)?;
        Ok(())
    }

    // ── Test and simulation controls ─────────────────────────────────

    /// Set a parameter on the device and record it as freshly observed.
    pub fn set(&self, path: &str, value: impl Into<String>) {
        let value = value.into();
        self.params.insert(path.to_owned(), Some(value.clone()));
        self.remember(path, Some(value));
    }

    /// Change a parameter on the device behind the cache's back.
    pub fn set_live(&self, path: &str, value: impl Into<String>) {
        self.params.insert(path.to_owned(), Some(value.into()));
    }

    /// Declare an object node (e.g. an empty collection instance).
    pub fn add_object(&self, path: &str) {
        self.params.entry(path.to_owned()).or_insert(None);
    }

    /// Delete `path` and everything beneath it.
    pub fn remove(&self, path: &str) {
        self.params.retain(|k, _| !is_within(path, k));
        self.cache.retain(|k, _| !is_within(path, k));
    }

    /// Make writes to `path` fail with `kind`.
    pub fn reject_writes(&self, path: &str, kind: WriteErrorKind) {
        self.faults.insert(path.to_owned(), kind);
    }

    /// Make probes of `path` fail with CWMP fault `code`.
    pub fn fail_probes(&self, path: &str, code: u32) {
        self.probe_faults.insert(path.to_owned(), code);
    }

    /// While offline every operation fails with [`Error::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Move the logical clock forward; later reads are stamped with it.
    pub fn advance_clock(&self) -> Freshness {
        Freshness(self.clock.fetch_add(1, Ordering::SeqCst).saturating_add(1))
    }

    pub fn now(&self) -> Freshness {
        Freshness(self.clock.load(Ordering::SeqCst))
    }

    // ── Inspection ───────────────────────────────────────────────────

    pub fn value(&self, path: &str) -> Option<String> {
        self.params.get(path).and_then(|r| r.value().clone())
    }

    pub fn tags(&self) -> BTreeMap<String, bool> {
        self.tags
            .iter()
            .map(|r| (r.key().clone(), *r.value()))
            .collect()
    }

    pub fn logs(&self) -> Vec<String> {
        self.logs.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn stats(&self) -> OpStats {
        OpStats {
            probes: self.counters.probes.load(Ordering::SeqCst),
            reads: self.counters.reads.load(Ordering::SeqCst),
            lists: self.counters.lists.load(Ordering::SeqCst),
            writes: self.counters.writes.load(Ordering::SeqCst),
            creates: self.counters.creates.load(Ordering::SeqCst),
        }
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn ensure_online(&self) -> Result<(), Error> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Unavailable {
                reason: "device session closed".into(),
            });
        }
        Ok(())
    }

    fn remember(&self, path: &str, value: Option<String>) {
        self.cache.insert(
            path.to_owned(),
            ObservedParameter {
                path: path.to_owned(),
                value,
                freshness: self.now(),
            },
        );
    }

    fn exists(&self, path: &str) -> bool {
        self.params.contains_key(path) || self.params.iter().any(|r| is_within(path, r.key()))
    }

    fn child_indices(&self, base: &str) -> BTreeSet<u32> {
        self.params
            .iter()
            .filter_map(|r| child_index(base, r.key()))
            .collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ParameterStore for MemoryStore {
    async fn probe(&self, path: &str) -> Result<bool, Error> {
        self.ensure_online()?;
        self.counters.probes.fetch_add(1, Ordering::SeqCst);
        if let Some(code) = self.probe_faults.get(path) {
            return Err(Error::Fault {
                path: path.to_owned(),
                code: *code,
                message: "probe refused".into(),
            });
        }
        Ok(self.exists(path))
    }

    async fn read(&self, path: &str) -> Result<ReadResult, Error> {
        self.ensure_online()?;
        self.counters.reads.fetch_add(1, Ordering::SeqCst);

        if let Some(value) = self.params.get(path).map(|r| r.value().clone()) {
            self.remember(path, value.clone());
            return Ok(ReadResult {
                exists: true,
                value,
            });
        }
        if self.exists(path) {
            return Ok(ReadResult {
                exists: true,
                value: None,
            });
        }
        Ok(ReadResult::missing())
    }

    async fn observed(&self, path: &str) -> Result<Option<ObservedParameter>, Error> {
        self.ensure_online()?;
        Ok(self.cache.get(path).map(|r| r.value().clone()))
    }

    async fn list_instances(&self, pattern: &str) -> Result<Vec<String>, Error> {
        self.ensure_online()?;
        self.counters.lists.fetch_add(1, Ordering::SeqCst);
        let base = pattern_base(pattern)?;
        Ok(self
            .child_indices(base)
            .into_iter()
            .map(|i| format!("{base}.{i}"))
            .collect())
    }

    async fn write(&self, path: &str, value: &ParamValue) -> Result<WriteResult, Error> {
        self.ensure_online()?;
        self.counters.writes.fetch_add(1, Ordering::SeqCst);

        if let Some(kind) = self.faults.get(path).map(|r| r.value().clone()) {
            debug!(path, %kind, "write refused");
            return Ok(WriteResult::failed(kind));
        }
        let wire = value.wire();
        self.params.insert(path.to_owned(), Some(wire.clone()));
        self.remember(path, Some(wire));
        debug!(path, %value, "parameter written");
        Ok(WriteResult::ok())
    }

    async fn create_instance(&self, base: &str) -> Result<u32, Error> {
        self.ensure_online()?;
        self.counters.creates.fetch_add(1, Ordering::SeqCst);
        let next = self
            .child_indices(base)
            .last()
            .copied()
            .unwrap_or(0)
            .saturating_add(1);
        self.params.insert(format!("{base}.{next}"), None);
        debug!(base, index = next, "instance created");
        Ok(next)
    }

    async fn set_tag(&self, name: &str, value: bool) -> Result<(), Error> {
        self.ensure_online()?;
        self.tags.insert(name.to_owned(), value);
        Ok(())
    }

    fn log(&self, message: &str) {
        if let Ok(mut logs) = self.logs.lock() {
            logs.push(message.to_owned());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_scalars_become_strings() {
        let store = MemoryStore::from_json(
            r#"{
                "asOf": 7,
                "parameters": {
                    "A.Name": "x",
                    "A.Port": 5060,
                    "A.Enable": true,
                    "A.Obj.1": null
                }
            }"#,
        )
        .unwrap();
        assert_eq!(store.value("A.Name").as_deref(), Some("x"));
        assert_eq!(store.value("A.Port").as_deref(), Some("5060"));
        assert_eq!(store.value("A.Enable").as_deref(), Some("true"));
        assert_eq!(store.value("A.Obj.1"), None);
        assert_eq!(store.now(), Freshness(7));
    }

    #[test]
    fn remove_drops_subtree_only() {
        let store = MemoryStore::new();
        store.set("A.B.1.X", "1");
        store.set("A.B.10.X", "10");
        store.remove("A.B.1");
        assert!(store.value("A.B.1.X").is_none());
        assert_eq!(store.value("A.B.10.X").as_deref(), Some("10"));
    }

    #[test]
    fn advance_clock_returns_new_marker() {
        let store = MemoryStore::new();
        assert_eq!(store.advance_clock(), Freshness(1));
        assert_eq!(store.advance_clock(), Freshness(2));
        assert_eq!(store.now(), Freshness(2));
    }

    #[test]
    fn to_snapshot_keeps_read_only_and_tags() {
        let store = MemoryStore::new();
        store.set("A.X", "1");
        store.reject_writes("A.X", WriteErrorKind::NotWritable);
        store.tags.insert("zte".into(), true);

        let snap = store.to_snapshot();
        assert!(snap.read_only.contains("A.X"));
        assert_eq!(snap.tags.get("zte"), Some(&true));
        assert_eq!(
            snap.parameters.get("A.X"),
            Some(&serde_json::Value::String("1".into()))
        );
    }
}
