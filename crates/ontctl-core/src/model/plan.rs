// ── Plans and reports ──
//
// Output of the reconciliation engine: write directives, tags and notices
// for one device, plus the per-attribute outcome list produced by `apply`.

use ontctl_api::{ParamValue, WriteErrorKind};
use serde::Serialize;
use strum::Display;

use super::capability::CapabilityKey;
use super::device::DeviceContext;
use super::instance::WlanInstance;

/// A collection instance the plan will create before writing into it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NewInstance {
    pub base: String,
    /// Index the plan allocated; the device may assign a different one.
    pub index: u32,
}

impl NewInstance {
    pub fn path(&self) -> String {
        format!("{}.{}", self.base, self.index)
    }
}

/// One parameter write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteDirective {
    pub capability: CapabilityKey,
    pub path: String,
    /// Serialized redacted for secrets.
    pub value: ParamValue,
    /// Value observed before the write, if any. Never set for secrets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    /// False only for writes into an instance this plan creates.
    pub existed_before: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<NewInstance>,
}

/// Device classification tag. Output only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub name: String,
    pub value: bool,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: bool) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NoticeKind {
    Policy,
    PathNotFound,
    Misaligned,
    ReadFailure,
    NumericParse,
    DuplicateRule,
}

/// A non-fatal condition encountered while planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    /// Capability key or policy field the notice is about.
    pub subject: String,
    pub message: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.subject, self.message)
    }
}

/// Everything a run intends to do to one device.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationPlan {
    pub device: DeviceContext,
    pub instances: Vec<WlanInstance>,
    pub directives: Vec<WriteDirective>,
    pub tags: Vec<Tag>,
    pub notices: Vec<Notice>,
    /// Capabilities already holding their desired value.
    pub in_sync: Vec<CapabilityKey>,
}

impl ReconciliationPlan {
    pub fn new(device: DeviceContext) -> Self {
        Self {
            device,
            instances: Vec::new(),
            directives: Vec::new(),
            tags: Vec::new(),
            notices: Vec::new(),
            in_sync: Vec::new(),
        }
    }

    pub fn is_converged(&self) -> bool {
        self.directives.is_empty()
    }

    pub fn tag(&self, name: &str) -> Option<bool> {
        self.tags.iter().find(|t| t.name == name).map(|t| t.value)
    }

    pub fn directive(&self, capability: &str) -> Option<&WriteDirective> {
        self.directives
            .iter()
            .find(|d| d.capability.as_str() == capability)
    }
}

// ── Apply results ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Written,
    /// The device refused the write.
    Rejected { kind: WriteErrorKind },
    /// The write could not be issued at all.
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeOutcome {
    pub capability: CapabilityKey,
    pub path: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl AttributeOutcome {
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Written
    }
}

/// Result of applying a plan.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub plan: ReconciliationPlan,
    pub outcomes: Vec<AttributeOutcome>,
    /// Tags the store refused; names only.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_tags: Vec<String>,
}

impl RunReport {
    pub fn written(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &AttributeOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none() && self.failed_tags.is_empty()
    }
}
