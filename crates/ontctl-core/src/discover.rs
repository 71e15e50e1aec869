// ── Instance discovery ──
//
// Enumerates variable-cardinality collections and classifies WLAN / radio
// instances into bands. Store failures here never abort a run: an instance
// whose metadata cannot be read is kept with an unknown band, and a
// collection that cannot be listed yields no instances.

use std::collections::BTreeSet;

use ontctl_api::path::instance_index;
use ontctl_api::{Error as StoreError, ParameterStore};
use tracing::{debug, warn};

use crate::classify::{classify_band, classify_operating_band, parse_channel};
use crate::model::{Band, CapabilityKey, DeviceContext, SchemaGeneration, WlanInstance, keys};
use crate::registry::{CapabilityRegistry, PathCandidate};

/// Result of one discovery pass.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub schema: SchemaGeneration,
    /// Store listing order (ascending index).
    pub instances: Vec<WlanInstance>,
}

impl Discovery {
    pub fn empty(schema: SchemaGeneration) -> Self {
        Self {
            schema,
            instances: Vec::new(),
        }
    }

    /// Instances classified into `band`, aligned or not, in discovery order.
    pub fn for_band(&self, band: Band) -> impl Iterator<Item = &WlanInstance> {
        self.instances
            .iter()
            .filter(move |inst| inst.band == Some(band))
    }

    /// Bands with at least one instance.
    pub fn bands(&self) -> BTreeSet<Band> {
        self.instances.iter().filter_map(|inst| inst.band).collect()
    }
}

/// Next index for a create-only collection: one past both the instance
/// count and the highest index in use. Gaps are never reused.
pub fn next_free_index(existing: &[u32]) -> u32 {
    let count = u32::try_from(existing.len()).unwrap_or(u32::MAX);
    let highest = existing.iter().copied().max().unwrap_or(0);
    count.max(highest).saturating_add(1)
}

/// Indices of the direct instances under `base`.
pub async fn list_indices(store: &dyn ParameterStore, base: &str) -> Result<Vec<u32>, StoreError> {
    let paths = store.list_instances(&format!("{base}.*")).await?;
    Ok(paths.iter().filter_map(|p| instance_index(p)).collect())
}

/// Enumerate and classify the device's WiFi instances.
pub async fn discover(
    store: &dyn ParameterStore,
    registry: &CapabilityRegistry,
    ctx: &DeviceContext,
) -> Discovery {
    let discovery = match ctx.schema {
        SchemaGeneration::Legacy => discover_legacy(store, registry, ctx).await,
        SchemaGeneration::Unified => discover_unified(store, registry, ctx).await,
    };
    debug!(
        instances = discovery.instances.len(),
        bands = ?discovery.bands(),
        "discovery complete"
    );
    discovery
}

async fn discover_legacy(
    store: &dyn ParameterStore,
    registry: &CapabilityRegistry,
    ctx: &DeviceContext,
) -> Discovery {
    let mut discovery = Discovery::empty(ctx.schema);
    let Some(base) = collection_base(registry, ctx, keys::WIFI_WLAN_CONFIGS) else {
        return discovery;
    };

    for index in listed(store, &base).await {
        let mut inst = WlanInstance::new(format!("{base}.{index}"), index);
        inst.raw_channel = read_member(store, registry, ctx, keys::RADIO_CHANNEL, &inst.path).await;
        inst.possible_channels =
            read_member(store, registry, ctx, keys::RADIO_POSSIBLE_CHANNELS, &inst.path).await;
        inst.band = classify_band(
            parse_channel(inst.raw_channel.as_deref()),
            inst.possible_channels.as_deref().unwrap_or_default(),
        );
        discovery.instances.push(inst);
    }
    discovery
}

async fn discover_unified(
    store: &dyn ParameterStore,
    registry: &CapabilityRegistry,
    ctx: &DeviceContext,
) -> Discovery {
    let mut discovery = Discovery::empty(ctx.schema);
    let Some(radios) = collection_base(registry, ctx, keys::WIFI_RADIOS) else {
        return discovery;
    };
    let ssids = sibling_indices(store, registry, ctx, keys::WIFI_SSIDS).await;
    let access_points = sibling_indices(store, registry, ctx, keys::WIFI_ACCESS_POINTS).await;

    for index in listed(store, &radios).await {
        let mut inst = WlanInstance::new(format!("{radios}.{index}"), index);
        inst.operating_band =
            read_member(store, registry, ctx, keys::RADIO_OPERATING_BAND, &inst.path).await;
        inst.band = inst
            .operating_band
            .as_deref()
            .and_then(classify_operating_band);

        if inst.band.is_none() {
            inst.raw_channel =
                read_member(store, registry, ctx, keys::RADIO_CHANNEL, &inst.path).await;
            inst.possible_channels =
                read_member(store, registry, ctx, keys::RADIO_POSSIBLE_CHANNELS, &inst.path)
                    .await;
            inst.band = classify_band(
                parse_channel(inst.raw_channel.as_deref()),
                inst.possible_channels.as_deref().unwrap_or_default(),
            );
        }

        inst.aligned = ssids.contains(&index) && access_points.contains(&index);
        if !inst.aligned {
            warn!(
                radio = %inst.path,
                "radio has no SSID / AccessPoint instance with the same index"
            );
        }
        discovery.instances.push(inst);
    }
    discovery
}

// ── Helpers ─────────────────────────────────────────────────────────

fn first_applicable<'a>(
    registry: &'a CapabilityRegistry,
    ctx: &'a DeviceContext,
    key: &str,
) -> Option<&'a PathCandidate> {
    registry
        .get(&CapabilityKey::new(key))
        .and_then(|entry| entry.applicable(ctx).next())
}

fn collection_base(registry: &CapabilityRegistry, ctx: &DeviceContext, key: &str) -> Option<String> {
    first_applicable(registry, ctx, key).map(|c| c.expand(ctx.schema, None))
}

async fn listed(store: &dyn ParameterStore, base: &str) -> Vec<u32> {
    match list_indices(store, base).await {
        Ok(indices) => indices,
        Err(e) => {
            warn!(base, error = %e, "cannot list instances");
            Vec::new()
        }
    }
}

async fn sibling_indices(
    store: &dyn ParameterStore,
    registry: &CapabilityRegistry,
    ctx: &DeviceContext,
    key: &str,
) -> BTreeSet<u32> {
    match collection_base(registry, ctx, key) {
        Some(base) => listed(store, &base).await.into_iter().collect(),
        None => BTreeSet::new(),
    }
}

async fn read_member(
    store: &dyn ParameterStore,
    registry: &CapabilityRegistry,
    ctx: &DeviceContext,
    key: &str,
    instance_path: &str,
) -> Option<String> {
    let path = first_applicable(registry, ctx, key)?.member_path(instance_path);
    match store.read(&path).await {
        Ok(result) => result.non_empty().map(str::to_owned),
        Err(e) => {
            warn!(%path, error = %e, "cannot read instance metadata");
            None
        }
    }
}
