// ── Path resolution ──
//
// Capability key + device context + discovered instances → one concrete,
// existence-confirmed path. Resolution never fails with an error: a key
// either resolves, has no candidate for this device at all, or has
// candidates none of which exist.

use std::fmt;

use ontctl_api::ParameterStore;
use serde::Serialize;
use tracing::{debug, warn};

use crate::discover::Discovery;
use crate::model::{Band, CapabilityKey, DeviceContext, KeyScope};
use crate::registry::{CapabilityEntry, CapabilityRegistry, EntryKind, PathCandidate};

/// Outcome of resolving one capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "resolution", content = "detail", rename_all = "snake_case")]
pub enum Resolution {
    Found(String),
    /// No candidate's vendor/schema filter admits this device.
    NotApplicable,
    /// Candidates exist for this device but none is present.
    NotFound(NotFoundReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundReason {
    UnknownCapability,
    /// The key names a different kind of entry (e.g. a collection).
    WrongKind,
    NoCandidateExists,
    NoInstance(Band),
    /// Every instance of the band lacks an index-aligned sibling.
    Misaligned(Band),
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCapability => f.write_str("unknown capability"),
            Self::WrongKind => f.write_str("capability cannot be resolved this way"),
            Self::NoCandidateExists => f.write_str("no candidate path exists on the device"),
            Self::NoInstance(band) => write!(f, "no {band} GHz instance discovered"),
            Self::Misaligned(band) => {
                write!(f, "{band} GHz radio has no index-aligned SSID / AccessPoint")
            }
        }
    }
}

impl Resolution {
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Found(path) => Some(path),
            Self::NotApplicable | Self::NotFound(_) => None,
        }
    }
}

/// Resolves capabilities for one device session.
pub struct Resolver<'a> {
    store: &'a dyn ParameterStore,
    registry: &'a CapabilityRegistry,
    ctx: &'a DeviceContext,
    discovery: &'a Discovery,
}

impl<'a> Resolver<'a> {
    pub fn new(
        store: &'a dyn ParameterStore,
        registry: &'a CapabilityRegistry,
        ctx: &'a DeviceContext,
        discovery: &'a Discovery,
    ) -> Self {
        Self {
            store,
            registry,
            ctx,
            discovery,
        }
    }

    pub fn context(&self) -> &DeviceContext {
        self.ctx
    }

    /// Resolve a parameter capability, probing candidates in priority order.
    pub async fn resolve(&self, key: &CapabilityKey) -> Resolution {
        let entry = match self.entry(key, EntryKind::Parameter) {
            Ok(entry) => entry,
            Err(resolution) => return resolution,
        };
        let candidates: Vec<&PathCandidate> = entry.applicable(self.ctx).collect();
        if candidates.is_empty() {
            debug!(capability = %key, "no candidate applies to this device");
            return Resolution::NotApplicable;
        }

        match key.scope() {
            KeyScope::Device => {
                let paths = candidates.iter().map(|c| c.expand(self.ctx.schema, None));
                self.first_present(key, paths).await.map_or(
                    Resolution::NotFound(NotFoundReason::NoCandidateExists),
                    Resolution::Found,
                )
            }
            KeyScope::Band { band, .. } => self.resolve_band(key, band, &candidates).await,
        }
    }

    /// Resolve a collection base path. Not probed: an empty collection is
    /// valid.
    pub fn resolve_collection(&self, key: &CapabilityKey) -> Resolution {
        let entry = match self.entry(key, EntryKind::Collection) {
            Ok(entry) => entry,
            Err(resolution) => return resolution,
        };
        entry
            .applicable(self.ctx)
            .next()
            .map_or(Resolution::NotApplicable, |c| {
                Resolution::Found(c.expand(self.ctx.schema, None))
            })
    }

    /// Resolve a member field under a concrete collection instance. Not
    /// probed: the instance may not exist yet.
    pub fn resolve_member(&self, key: &CapabilityKey, instance_path: &str) -> Resolution {
        let entry = match self.entry(key, EntryKind::Member) {
            Ok(entry) => entry,
            Err(resolution) => return resolution,
        };
        entry
            .applicable(self.ctx)
            .next()
            .map_or(Resolution::NotApplicable, |c| {
                Resolution::Found(c.member_path(instance_path))
            })
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn entry(&self, key: &CapabilityKey, kind: EntryKind) -> Result<&'a CapabilityEntry, Resolution> {
        match self.registry.get(key) {
            Some(entry) if entry.kind == kind => Ok(entry),
            Some(_) => Err(Resolution::NotFound(NotFoundReason::WrongKind)),
            None => Err(Resolution::NotFound(NotFoundReason::UnknownCapability)),
        }
    }

    /// Instance-major: the first aligned instance of the band is primary;
    /// candidates are tried in priority order within each instance.
    async fn resolve_band(
        &self,
        key: &CapabilityKey,
        band: Band,
        candidates: &[&PathCandidate],
    ) -> Resolution {
        let instances: Vec<_> = self.discovery.for_band(band).collect();
        if instances.is_empty() {
            return Resolution::NotFound(NotFoundReason::NoInstance(band));
        }

        let aligned: Vec<_> = instances.iter().filter(|inst| inst.aligned).collect();
        if aligned.is_empty() {
            warn!(
                capability = %key,
                instances = instances.len(),
                "every {band} GHz instance is misaligned"
            );
            return Resolution::NotFound(NotFoundReason::Misaligned(band));
        }

        for inst in aligned {
            let paths = candidates
                .iter()
                .map(|c| c.expand(self.ctx.schema, Some(inst.index)));
            if let Some(path) = self.first_present(key, paths).await {
                return Resolution::Found(path);
            }
        }
        Resolution::NotFound(NotFoundReason::NoCandidateExists)
    }

    /// Probe each path in order; probe failures count as absent. A lost
    /// session ends the search since every later probe fails the same way.
    async fn first_present(
        &self,
        key: &CapabilityKey,
        paths: impl Iterator<Item = String>,
    ) -> Option<String> {
        for path in paths {
            match self.store.probe(&path).await {
                Ok(true) => {
                    debug!(capability = %key, %path, "resolved");
                    return Some(path);
                }
                Ok(false) => {}
                Err(e) if e.is_not_found() => {
                    debug!(capability = %key, path, "device reports no such parameter");
                }
                Err(e) if e.is_transient() => {
                    warn!(capability = %key, path, error = %e, "store unavailable, stopping probes");
                    return None;
                }
                Err(e) => {
                    warn!(capability = %key, path, error = %e, "probe failed, treating as absent");
                }
            }
        }
        None
    }
}
