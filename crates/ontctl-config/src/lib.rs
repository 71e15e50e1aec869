//! Shared configuration for the ontctl CLI.
//!
//! TOML profiles merged with `ONTCTL_` environment overrides, and the
//! translation to `ontctl_core::EngineConfig`. The CLI layers its
//! `GlobalOpts`-aware wrappers on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ontctl_core::{EngineConfig, OpticalThresholds, VendorAlias, WanConnectionKind};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named engine profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

/// A named engine profile. Every field falls back to the engine default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Optical thresholds applied when a policy gives none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optical: Option<OpticalThresholds>,

    /// Manufacturer aliases consulted before the builtin table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<VendorAlias>,

    /// WAN connection carrying port mappings when a policy omits `wanType`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_forward_wan: Option<WanConnectionKind>,
}

impl Config {
    /// The named profile, or the default one. A missing default profile
    /// yields an empty profile; a missing named profile is an error.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, Profile), ConfigError> {
        if let Some(name) = name {
            return self
                .profiles
                .get(name)
                .map(|p| (name.to_owned(), p.clone()))
                .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() });
        }
        let name = self
            .default_profile
            .clone()
            .unwrap_or_else(|| "default".into());
        let profile = self.profiles.get(&name).cloned().unwrap_or_default();
        Ok((name, profile))
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "ontctl", "ontctl").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("ontctl");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` (missing is fine) merged over defaults, then
/// `ONTCTL_` environment variables (`ONTCTL_DEFAULTS__OUTPUT=json`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ONTCTL_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build the immutable engine configuration for a profile.
pub fn profile_to_engine_config(profile: &Profile) -> Result<EngineConfig, ConfigError> {
    let mut config = EngineConfig::default();

    if !profile.aliases.is_empty() {
        if let Some(empty) = profile.aliases.iter().position(|a| a.needle.trim().is_empty()) {
            return Err(ConfigError::Validation {
                field: format!("aliases[{empty}].needle"),
                reason: "must not be empty".into(),
            });
        }
        let aliases = profile
            .aliases
            .iter()
            .map(|a| VendorAlias::new(a.needle.trim(), a.tag));
        config = config.with_aliases(aliases);
    }

    if let Some(optical) = profile.optical {
        if !optical.warning.is_finite() || !optical.critical.is_finite() {
            return Err(ConfigError::Validation {
                field: "optical".into(),
                reason: "thresholds must be finite numbers".into(),
            });
        }
        if optical.critical >= optical.warning {
            return Err(ConfigError::Validation {
                field: "optical".into(),
                reason: format!(
                    "critical ({}) must be below warning ({})",
                    optical.critical, optical.warning
                ),
            });
        }
        config = config.with_optical(optical);
    }

    if let Some(wan) = profile.port_forward_wan {
        config = config.with_port_forward_wan(wan);
    }
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ontctl_core::VendorTag;

    #[test]
    fn missing_default_profile_is_empty() {
        let cfg = Config::default();
        let (name, profile) = cfg.profile(None).unwrap();
        assert_eq!(name, "default");
        assert_eq!(profile, Profile::default());
    }

    #[test]
    fn missing_named_profile_is_an_error() {
        let err = Config::default().profile(Some("lab")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProfile { .. }));
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let profile = Profile {
            optical: Some(OpticalThresholds {
                warning: -30.0,
                critical: -25.0,
            }),
            ..Profile::default()
        };
        let err = profile_to_engine_config(&profile).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "optical"));
    }

    #[test]
    fn aliases_are_normalized_and_take_priority() {
        let profile = Profile {
            aliases: vec![VendorAlias {
                needle: " Sercomm ".into(),
                tag: VendorTag::Zte,
            }],
            ..Profile::default()
        };
        let config = profile_to_engine_config(&profile).unwrap();
        assert_eq!(config.aliases.lookup("SERCOMM Corp"), Some(VendorTag::Zte));
        assert_eq!(config.aliases.lookup("Huawei"), Some(VendorTag::Huawei));
    }
}
