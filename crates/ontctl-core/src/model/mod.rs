// ── Domain model ──
//
// Types shared by detection, resolution and reconciliation.

pub mod band;
pub mod capability;
pub mod device;
pub mod instance;
pub mod intent;
pub mod plan;

pub use band::Band;
pub use capability::{CapabilityKey, KeyScope, keys};
pub use device::{DeviceContext, DeviceIdentity, SchemaGeneration, VendorTag};
pub use instance::WlanInstance;
pub use intent::{
    BandIntent, ManagementIntent, OpticalAlarm, OpticalThresholds, PortForwardIntent, PortRule,
    ReconciliationIntent, SecurityMode, VoipIntent, WanConnectionKind, WanIntent,
};
pub use plan::{
    AttributeOutcome, NewInstance, Notice, NoticeKind, OutcomeStatus, ReconciliationPlan,
    RunReport, Tag, WriteDirective,
};
