//! Config subcommand handlers.

use ontctl_config::{Config, Profile, save_config_to};
use ontctl_core::OpticalThresholds;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, available_profiles};
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = config::config_path(global);
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let rendered = toml::to_string_pretty(&cfg)
                .map_err(|e| CliError::Output(e.to_string()))?;
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            save_config_to(&starter_config(), &path)?;
            tracing::info!(path = %path.display(), "config written");
            output::print_output(&format!("Wrote {}", path.display()), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load(global)?;
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            let lines: Vec<String> = cfg
                .profiles
                .keys()
                .map(|name| {
                    let marker = if name == default { "*" } else { " " };
                    format!("{marker} {name}")
                })
                .collect();
            output::print_output(&lines.join("\n"), global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load(global)?;
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: available_profiles(&cfg),
                    name,
                });
            }
            cfg.default_profile = Some(name.clone());
            save_config_to(&cfg, &path)?;
            output::print_output(&format!("Default profile set to '{name}'"), global.quiet);
            Ok(())
        }
    }
}

/// A config holding one `default` profile with the engine defaults spelled
/// out, so users have something to edit.
fn starter_config() -> Config {
    let mut cfg = Config::default();
    cfg.profiles.insert(
        "default".into(),
        Profile {
            optical: Some(OpticalThresholds::default()),
            ..Profile::default()
        },
    );
    cfg
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn starter_profile_is_valid() {
        let cfg = starter_config();
        let (name, profile) = cfg.profile(None).unwrap();
        assert_eq!(name, "default");
        assert!(ontctl_config::profile_to_engine_config(&profile).is_ok());
    }
}
