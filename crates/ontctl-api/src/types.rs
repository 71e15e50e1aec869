// ── Typed store results ──
//
// Every store operation has a fixed result shape. Values on the wire are
// strings; `ParamValue` carries the typed form the caller wants written and
// knows how to compare itself against a device's string rendering.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

// ── Freshness ───────────────────────────────────────────────────────

/// Logical "as of" marker.
///
/// Not a wall-clock timestamp: a cached observation whose marker is lower
/// than the marker a caller requires must be re-read before use.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Freshness(pub u64);

impl Freshness {
    pub const ANY: Self = Self(0);

    /// Whether an observation carrying `self` satisfies `required`.
    pub fn satisfies(self, required: Self) -> bool {
        self >= required
    }

    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

// ── ParamValue ──────────────────────────────────────────────────────

/// A typed value destined for a device parameter.
#[derive(Debug, Clone)]
pub enum ParamValue {
    Text(String),
    Bool(bool),
    UInt(u64),
    Int(i64),
    /// Passwords and passphrases. Rendered redacted everywhere except
    /// [`wire`](Self::wire).
    Secret(SecretString),
}

impl ParamValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn secret(s: impl Into<String>) -> Self {
        Self::Secret(SecretString::from(s.into()))
    }

    /// The exact string sent to the device.
    pub fn wire(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Bool(b) => b.to_string(),
            Self::UInt(n) => n.to_string(),
            Self::Int(n) => n.to_string(),
            Self::Secret(s) => s.expose_secret().to_owned(),
        }
    }

    /// Whether a device-reported string already holds this value.
    ///
    /// Booleans accept `1`/`0` and any casing of `true`/`false`; integers
    /// ignore surrounding whitespace.
    pub fn matches(&self, observed: &str) -> bool {
        match self {
            Self::Text(s) => s == observed,
            Self::Bool(b) => parse_bool(observed) == Some(*b),
            Self::UInt(n) => observed.trim().parse::<u64>().ok() == Some(*n),
            Self::Int(n) => observed.trim().parse::<i64>().ok() == Some(*n),
            Self::Secret(s) => s.expose_secret() == observed,
        }
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, Self::Secret(_))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::UInt(a), Self::UInt(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Secret(a), Self::Secret(b)) => a.expose_secret() == b.expose_secret(),
            _ => false,
        }
    }
}

impl Eq for ParamValue {}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secret(_) => f.write_str(REDACTED),
            other => f.write_str(&other.wire()),
        }
    }
}

const REDACTED: &str = "********";

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(s) => serializer.serialize_str(s),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::UInt(n) => serializer.serialize_u64(*n),
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::Secret(_) => serializer.serialize_str(REDACTED),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<u16> for ParamValue {
    fn from(n: u16) -> Self {
        Self::UInt(u64::from(n))
    }
}

impl From<u32> for ParamValue {
    fn from(n: u32) -> Self {
        Self::UInt(u64::from(n))
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

// ── Operation results ───────────────────────────────────────────────

/// Result of a `read`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadResult {
    pub exists: bool,
    /// `None` for object nodes and for parameters the device left empty.
    pub value: Option<String>,
}

impl ReadResult {
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn present(value: impl Into<String>) -> Self {
        Self {
            exists: true,
            value: Some(value.into()),
        }
    }

    /// The value, if the parameter exists and is non-empty.
    pub fn non_empty(&self) -> Option<&str> {
        self.value
            .as_deref()
            .filter(|v| self.exists && !v.is_empty())
    }
}

/// Why a device refused a write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteErrorKind {
    NotWritable,
    InvalidValue,
    NotFound,
    Rejected(String),
}

impl fmt::Display for WriteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotWritable => f.write_str("parameter is not writable"),
            Self::InvalidValue => f.write_str("invalid value"),
            Self::NotFound => f.write_str("parameter not found"),
            Self::Rejected(reason) => write!(f, "rejected: {reason}"),
        }
    }
}

/// Result of a `write`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<WriteErrorKind>,
}

impl WriteResult {
    pub fn ok() -> Self {
        Self {
            ok: true,
            error_kind: None,
        }
    }

    pub fn failed(kind: WriteErrorKind) -> Self {
        Self {
            ok: false,
            error_kind: Some(kind),
        }
    }
}

/// A cached value the store already holds, with the marker it was taken at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedParameter {
    pub path: String,
    pub value: Option<String>,
    pub freshness: Freshness,
}
