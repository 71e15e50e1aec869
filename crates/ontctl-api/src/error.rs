use thiserror::Error;

/// Top-level error type for the `ontctl-api` crate.
///
/// Covers every failure a parameter store can surface: the session to the
/// device, individual parameter operations, and snapshot (de)serialization.
/// `ontctl-core` maps these into reconciliation diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Session ─────────────────────────────────────────────────────
    /// The device session is gone (device offline, session closed).
    #[error("Parameter store unavailable: {reason}")]
    Unavailable { reason: String },

    // ── Parameter operations ────────────────────────────────────────
    /// The device answered with a fault for this path.
    #[error("Fault {code} on {path}: {message}")]
    Fault {
        path: String,
        code: u32,
        message: String,
    },

    /// A path or instance pattern that cannot be addressed.
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    // ── Snapshots ───────────────────────────────────────────────────
    /// Snapshot JSON could not be parsed or produced.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Snapshot file could not be read or written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if the session itself failed, so every further
    /// operation in it will fail the same way.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Returns `true` if the device reported the path as nonexistent.
    ///
    /// 9005 is the CWMP "invalid parameter name" fault code.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Fault { code: 9005, .. })
    }
}
