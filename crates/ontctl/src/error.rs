//! CLI error types with miette diagnostics and process exit codes.

use miette::Diagnostic;
use thiserror::Error;

use ontctl_config::ConfigError;
use ontctl_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const DETECTION: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 5;
    pub const CONFIG: i32 = 6;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Input ────────────────────────────────────────────────────────
    #[error("Invalid {field}: {reason}")]
    #[diagnostic(code(ontctl::validation))]
    Validation { field: String, reason: String },

    #[error("Cannot load device snapshot {path}: {reason}")]
    #[diagnostic(
        code(ontctl::snapshot),
        help("A snapshot is a JSON object with a `parameters` map of full paths to values.")
    )]
    Snapshot { path: String, reason: String },

    #[error("Cannot read policy {path}: {reason}")]
    #[diagnostic(
        code(ontctl::policy),
        help("The policy must be a single JSON object. Fields it gets wrong are reported per device.")
    )]
    Policy { path: String, reason: String },

    // ── Engine ───────────────────────────────────────────────────────
    #[error("Device detection failed: {reason}")]
    #[diagnostic(
        code(ontctl::detection),
        help("The snapshot must carry a non-empty DeviceID.Manufacturer.")
    )]
    Detection { reason: String },

    #[error("No parameter for '{capability}' on this device ({context})")]
    #[diagnostic(
        code(ontctl::not_found),
        help("Capabilities are dot-namespaced, e.g. wan.ip_address or wifi.band.5.ssid.")
    )]
    CapabilityNotFound { capability: String, context: String },

    #[error("{failed} of {total} devices did not complete")]
    #[diagnostic(code(ontctl::fleet), help("Per-device errors are listed above."))]
    FleetIncomplete { failed: usize, total: usize },

    #[error("{count} writes or tags were refused")]
    #[diagnostic(
        code(ontctl::rejected),
        help("Re-run `ontctl plan` to see what is still pending.")
    )]
    Rejected { count: usize },

    #[error(transparent)]
    #[diagnostic(code(ontctl::engine))]
    Core(CoreError),

    // ── Config ───────────────────────────────────────────────────────
    #[error("Profile '{name}' not found")]
    #[diagnostic(
        code(ontctl::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Config file already exists at {path}")]
    #[diagnostic(code(ontctl::config_exists), help("Pass --force to overwrite it."))]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(ontctl::config))]
    Config(ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Output serialization failed: {0}")]
    #[diagnostic(code(ontctl::output))]
    Output(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. } => exit_code::USAGE,
            Self::Detection { .. } | Self::FleetIncomplete { .. } => exit_code::DETECTION,
            Self::CapabilityNotFound { .. } => exit_code::NOT_FOUND,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::ProfileNotFound { .. } | Self::ConfigExists { .. } | Self::Config(_) => {
                exit_code::CONFIG
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Detection { reason } => CliError::Detection { reason },
            CoreError::PathNotFound {
                capability,
                context,
            } => CliError::CapabilityNotFound {
                capability,
                context,
            },
            CoreError::Policy { field, reason } => CliError::Validation {
                field: format!("policy field '{field}'"),
                reason,
            },
            other => CliError::Core(other),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation {
                field: format!("config {field}"),
                reason,
            },
            other => CliError::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_maps_to_its_exit_code() {
        let err = CliError::from(CoreError::Detection {
            reason: "no manufacturer".into(),
        });
        assert_eq!(err.exit_code(), exit_code::DETECTION);
    }

    #[test]
    fn missing_path_is_not_found() {
        let err = CliError::from(CoreError::PathNotFound {
            capability: "wan.status".into(),
            context: "no vendor".into(),
        });
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
        assert!(err.to_string().contains("wan.status"));
    }

    #[test]
    fn store_errors_are_general() {
        let err = CliError::from(CoreError::from(ontctl_api::Error::Unavailable {
            reason: "offline".into(),
        }));
        assert!(matches!(err, CliError::Core(CoreError::StoreUnavailable { .. })));
        assert_eq!(err.exit_code(), exit_code::GENERAL);
    }
}
