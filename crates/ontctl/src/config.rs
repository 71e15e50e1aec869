//! CLI-side configuration: thin wrapper over `ontctl_config` that folds in
//! `GlobalOpts` overrides.

use std::path::PathBuf;

use clap::ValueEnum;
use ontctl_config::{Config, ConfigError, Profile, load_config_from, profile_to_engine_config};
use ontctl_core::EngineConfig;

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

/// `--config` / `ONTCTL_CONFIG`, else the platform path.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(ontctl_config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(load_config_from(&config_path(global))?)
}

/// The profile selected by `--profile`, falling back to `default_profile`.
pub fn active_profile(global: &GlobalOpts, cfg: &Config) -> Result<(String, Profile), CliError> {
    cfg.profile(global.profile.as_deref()).map_err(|err| match err {
        ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
            name,
            available: available_profiles(cfg),
        },
        other => other.into(),
    })
}

pub fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        return "(none)".into();
    }
    cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
}

/// Everything a command needs after config resolution.
pub struct Settings {
    pub profile: String,
    pub engine: EngineConfig,
    pub output: OutputFormat,
    pub color: ColorMode,
}

pub fn resolve(global: &GlobalOpts) -> Result<Settings, CliError> {
    let cfg = load(global)?;
    let (profile, selected) = active_profile(global, &cfg)?;
    let engine = profile_to_engine_config(&selected)?;

    let output = match global.output {
        Some(output) => output,
        None => parse_setting("defaults.output", &cfg.defaults.output)?,
    };
    let color = match global.color {
        Some(color) => color,
        None => parse_setting("defaults.color", &cfg.defaults.color)?,
    };

    tracing::debug!(%profile, ?output, ?color, "configuration resolved");
    Ok(Settings {
        profile,
        engine,
        output,
        color,
    })
}

fn parse_setting<T: ValueEnum>(field: &str, raw: &str) -> Result<T, CliError> {
    T::from_str(raw, true).map_err(|reason| CliError::Validation {
        field: format!("config {field}"),
        reason,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn settings_parse_case_insensitively() {
        let format: OutputFormat = parse_setting("defaults.output", "JSON-compact").unwrap();
        assert_eq!(format, OutputFormat::JsonCompact);
        let err = parse_setting::<ColorMode>("defaults.color", "sometimes").unwrap_err();
        assert!(err.to_string().contains("defaults.color"));
    }

    #[test]
    fn profile_listing() {
        let mut cfg = Config::default();
        assert_eq!(available_profiles(&cfg), "(none)");
        cfg.profiles.insert("lab".into(), Profile::default());
        cfg.profiles.insert("field".into(), Profile::default());
        assert_eq!(available_profiles(&cfg), "field, lab");
    }
}
