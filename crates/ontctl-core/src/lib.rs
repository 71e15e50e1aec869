// ontctl-core: Vendor-agnostic capability resolution and declarative
// reconciliation for ONT parameter trees.

pub mod classify;
pub mod config;
pub mod detect;
pub mod discover;
pub mod error;
pub mod model;
pub mod policy;
pub mod reconcile;
pub mod registry;
pub mod resolve;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::EngineConfig;
pub use detect::{VendorAlias, VendorAliases};
pub use discover::{Discovery, next_free_index};
pub use error::CoreError;
pub use policy::{PolicyError, ValidatedPolicy, validate, validate_str};
pub use reconcile::{OPTICAL_CRITICAL, OPTICAL_WARNING, Reconciler};
pub use registry::CapabilityRegistry;
pub use resolve::{NotFoundReason, Resolution, Resolver};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    // Identity
    Band, CapabilityKey, DeviceContext, DeviceIdentity, SchemaGeneration, VendorTag, keys,
    // Intent
    BandIntent, ManagementIntent, OpticalThresholds, PortForwardIntent, PortRule,
    ReconciliationIntent, SecurityMode, VoipIntent, WanConnectionKind, WanIntent,
    // Plans and reports
    AttributeOutcome, Notice, NoticeKind, OutcomeStatus, ReconciliationPlan, RunReport, Tag,
    WriteDirective,
};
