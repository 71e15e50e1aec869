// ── Core error types ──
//
// Reconciliation-level errors. Store failures arrive as `ontctl_api::Error`
// and are translated by the `From` impl below; callers never match on
// transport details directly.

use ontctl_api::WriteErrorKind;
use thiserror::Error;

/// Unified error type for the core crate.
///
/// Only [`CoreError::Detection`] aborts a run. Every other variant is
/// recorded against a single attribute and the run continues.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Fatal ────────────────────────────────────────────────────────
    #[error("Device detection failed: {reason}")]
    Detection { reason: String },

    // ── Per-attribute ────────────────────────────────────────────────
    #[error("Invalid policy field '{field}': {reason}")]
    Policy { field: String, reason: String },

    #[error("No concrete path for {capability} ({context})")]
    PathNotFound { capability: String, context: String },

    #[error("{capability}: '{value}' is not a number")]
    NumericParse { capability: String, value: String },

    #[error("Write to {path} failed: {kind}")]
    WriteFailure { path: String, kind: WriteErrorKind },

    // ── Store errors (wrapped, not exposed raw) ──────────────────────
    #[error("Parameter store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    #[error("Parameter store error: {message}")]
    Store { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether this error aborts the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Detection { .. })
    }
}

// ── Conversion from store errors ────────────────────────────────────

impl From<ontctl_api::Error> for CoreError {
    fn from(err: ontctl_api::Error) -> Self {
        match err {
            ontctl_api::Error::Unavailable { reason } => CoreError::StoreUnavailable { reason },
            ontctl_api::Error::Fault {
                path,
                code,
                message,
            } => CoreError::Store {
                message: format!("fault {code} on {path}: {message}"),
            },
            ontctl_api::Error::InvalidPath { path, reason } => {
                CoreError::Internal(format!("invalid path '{path}': {reason}"))
            }
            ontctl_api::Error::Snapshot(e) => CoreError::Config {
                message: format!("device snapshot: {e}"),
            },
            ontctl_api::Error::Io(e) => CoreError::Config {
                message: format!("device snapshot: {e}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_detection_is_fatal() {
        assert!(
            CoreError::Detection {
                reason: "no manufacturer".into()
            }
            .is_fatal()
        );
        assert!(
            !CoreError::WriteFailure {
                path: "Device.X".into(),
                kind: WriteErrorKind::NotWritable,
            }
            .is_fatal()
        );
    }

    #[test]
    fn fault_maps_to_store_error() {
        let err: CoreError = ontctl_api::Error::Fault {
            path: "Device.X".into(),
            code: 9002,
            message: "Internal error".into(),
        }
        .into();
        assert!(matches!(err, CoreError::Store { .. }));
        assert!(err.to_string().contains("9002"));
    }
}
