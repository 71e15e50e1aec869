// ── Vendor / schema detection ──
//
// Turns the device's identity attributes plus a single existence probe into
// a `DeviceContext`. Runs once per session; the result is never re-derived.

use ontctl_api::ParameterStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::model::{DeviceContext, DeviceIdentity, SchemaGeneration, VendorTag};

/// Present only on devices speaking the unified schema.
pub const UNIFIED_PROBE_PATH: &str = "Device.DeviceInfo.Manufacturer";

pub const MANUFACTURER_PATH: &str = "DeviceID.Manufacturer";
pub const PRODUCT_CLASS_PATH: &str = "DeviceID.ProductClass";
pub const SERIAL_NUMBER_PATH: &str = "DeviceID.SerialNumber";

// ── Alias table ─────────────────────────────────────────────────────

/// Manufacturer substring → vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorAlias {
    pub needle: String,
    pub tag: VendorTag,
}

impl VendorAlias {
    pub fn new(needle: &str, tag: VendorTag) -> Self {
        Self {
            needle: needle.to_lowercase(),
            tag,
        }
    }
}

/// Ordered alias table; the first matching needle wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorAliases(Vec<VendorAlias>);

impl Default for VendorAliases {
    fn default() -> Self {
        Self::builtin()
    }
}

impl VendorAliases {
    pub fn builtin() -> Self {
        Self(vec![
            VendorAlias::new("huawei", VendorTag::Huawei),
            VendorAlias::new("zte", VendorTag::Zte),
            VendorAlias::new("nokia", VendorTag::Nokia),
            VendorAlias::new("alcl", VendorTag::Nokia),
            VendorAlias::new("alu", VendorTag::Nokia),
            VendorAlias::new("fiberhome", VendorTag::Fiberhome),
            VendorAlias::new("tp-link", VendorTag::Tplink),
            VendorAlias::new("dasan", VendorTag::Dasan),
        ])
    }

    /// Builtin table with `extra` consulted first.
    pub fn with_overrides(extra: impl IntoIterator<Item = VendorAlias>) -> Self {
        let mut entries: Vec<VendorAlias> = extra
            .into_iter()
            .map(|a| VendorAlias::new(&a.needle, a.tag))
            .filter(|a| !a.needle.is_empty())
            .collect();
        entries.extend(Self::builtin().0);
        Self(entries)
    }

    /// Case-insensitive substring match against the manufacturer string.
    pub fn lookup(&self, manufacturer: &str) -> Option<VendorTag> {
        let lower = manufacturer.to_lowercase();
        self.0
            .iter()
            .find(|alias| lower.contains(&alias.needle))
            .map(|alias| alias.tag)
    }

    pub fn entries(&self) -> &[VendorAlias] {
        &self.0
    }
}

// ── Detection ───────────────────────────────────────────────────────

/// Read `DeviceID.*` from the store. A missing or empty manufacturer is
/// fatal; product class and serial default to empty.
pub async fn read_identity(store: &dyn ParameterStore) -> Result<DeviceIdentity, CoreError> {
    let manufacturer = store
        .read(MANUFACTURER_PATH)
        .await
        .map_err(|e| CoreError::Detection {
            reason: format!("cannot read {MANUFACTURER_PATH}: {e}"),
        })?
        .non_empty()
        .map(str::to_owned)
        .ok_or_else(|| CoreError::Detection {
            reason: format!("{MANUFACTURER_PATH} is not reported"),
        })?;

    let product_class = read_optional(store, PRODUCT_CLASS_PATH).await;
    let serial = read_optional(store, SERIAL_NUMBER_PATH).await;

    Ok(DeviceIdentity {
        manufacturer,
        product_class,
        serial,
    })
}

async fn read_optional(store: &dyn ParameterStore, path: &str) -> String {
    match store.read(path).await {
        Ok(result) => result.value.unwrap_or_default(),
        Err(e) => {
            warn!(path, error = %e, "identity attribute unreadable");
            String::new()
        }
    }
}

/// Derive the context for an already-known identity: one probe decides the
/// schema generation.
pub async fn detect_with_identity(
    store: &dyn ParameterStore,
    identity: DeviceIdentity,
    aliases: &VendorAliases,
) -> Result<DeviceContext, CoreError> {
    let unified = store
        .probe(UNIFIED_PROBE_PATH)
        .await
        .map_err(|e| CoreError::Detection {
            reason: format!("schema probe failed: {e}"),
        })?;
    let schema = if unified {
        SchemaGeneration::Unified
    } else {
        SchemaGeneration::Legacy
    };
    let vendor = aliases.lookup(&identity.manufacturer);

    debug!(
        manufacturer = %identity.manufacturer,
        vendor = vendor.map_or("none", VendorTag::as_str),
        %schema,
        "device detected"
    );
    Ok(DeviceContext::new(identity, vendor, schema))
}

/// Read identity from the store, then detect.
pub async fn detect(
    store: &dyn ParameterStore,
    aliases: &VendorAliases,
) -> Result<DeviceContext, CoreError> {
    let identity = read_identity(store).await?;
    detect_with_identity(store, identity, aliases).await
}
