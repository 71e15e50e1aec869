// ── Engine configuration ──
//
// Immutable settings shared by every run: the vendor alias table and the
// defaults the policy validator falls back to.

use crate::detect::{VendorAlias, VendorAliases};
use crate::model::{OpticalThresholds, WanConnectionKind};

/// Process-wide engine settings. Built once at startup.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub aliases: VendorAliases,
    /// Used when a policy document gives no optical thresholds.
    pub optical: OpticalThresholds,
    /// Legacy WAN connection carrying port mappings when a policy omits
    /// `portForward.wanType`.
    pub port_forward_wan: WanConnectionKind,
}

impl EngineConfig {
    pub fn with_aliases(mut self, extra: impl IntoIterator<Item = VendorAlias>) -> Self {
        self.aliases = VendorAliases::with_overrides(extra);
        self
    }

    pub fn with_optical(mut self, optical: OpticalThresholds) -> Self {
        self.optical = optical;
        self
    }

    pub fn with_port_forward_wan(mut self, wan: WanConnectionKind) -> Self {
        self.port_forward_wan = wan;
        self
    }
}
