//! Command handlers and the shared device-file plumbing they use.

pub mod apply;
pub mod config_cmd;
pub mod detect;
pub mod plan;
pub mod read;

use std::future::Future;
use std::path::{Path, PathBuf};

use ontctl_api::MemoryStore;
use ontctl_core::CoreError;
use serde_json::Value;
use tokio::task::JoinSet;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output::{self, Palette, Sourced};

/// Dispatch a parsed command. Config and completions work without a
/// loadable config file; device commands resolve settings first.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Config(args) => config_cmd::handle(args, global),
        Command::Completions(args) => {
            completions(args.shell);
            Ok(())
        }
        device_cmd => {
            let settings = config::resolve(global)?;
            tracing::debug!(command = ?device_cmd, profile = %settings.profile, "dispatching command");
            match device_cmd {
                Command::Plan(args) => plan::handle(args, &settings, global).await,
                Command::Apply(args) => apply::handle(args, &settings, global).await,
                Command::Read(args) => read::handle(args, &settings, global).await,
                Command::Detect(args) => detect::handle(args, &settings, global).await,
                Command::Config(_) | Command::Completions(_) => Ok(()),
            }
        }
    }
}

fn completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;

    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "ontctl", &mut std::io::stdout());
}

// ── Input files ──────────────────────────────────────────────────────

pub(crate) fn source_name(path: &Path) -> String {
    path.display().to_string()
}

pub(crate) fn load_policy(path: &Path) -> Result<Value, CliError> {
    let policy_err = |reason: String| CliError::Policy {
        path: source_name(path),
        reason,
    };
    let raw = std::fs::read_to_string(path).map_err(|e| policy_err(e.to_string()))?;
    let doc: Value = serde_json::from_str(&raw).map_err(|e| policy_err(e.to_string()))?;
    if !doc.is_object() {
        return Err(policy_err("expected a JSON object".into()));
    }
    Ok(doc)
}

pub(crate) fn load_device(path: &Path) -> Result<MemoryStore, CliError> {
    MemoryStore::load(path).map_err(|e| CliError::Snapshot {
        path: source_name(path),
        reason: e.to_string(),
    })
}

// ── Fleet execution ──────────────────────────────────────────────────

/// Run `task` once per device file, concurrently. Results come back in
/// input order.
pub(crate) async fn run_fleet<T, F, Fut>(
    devices: &[PathBuf],
    task: F,
) -> Vec<(String, Result<T, CliError>)>
where
    T: Send + 'static,
    F: Fn(PathBuf) -> Fut,
    Fut: Future<Output = Result<T, CliError>> + Send + 'static,
{
    let mut set = JoinSet::new();
    for (idx, path) in devices.iter().enumerate() {
        let fut = task(path.clone());
        set.spawn(async move { (idx, fut.await) });
    }

    let mut slots: Vec<Option<Result<T, CliError>>> = devices.iter().map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, result)) => {
                if let Some(slot) = slots.get_mut(idx) {
                    *slot = Some(result);
                }
            }
            Err(err) => tracing::error!(error = %err, "device task aborted"),
        }
    }

    devices
        .iter()
        .zip(slots)
        .map(|(path, slot)| {
            let result = slot.unwrap_or_else(|| {
                Err(CliError::Core(CoreError::Internal("device task aborted".into())))
            });
            (source_name(path), result)
        })
        .collect()
}

/// Split fleet results into successes and a failure count. Failures are
/// printed to stderr as they are found; a single-device run returns its
/// error directly so it keeps its own diagnostic and exit code.
pub(crate) fn settle<T>(
    results: Vec<(String, Result<T, CliError>)>,
    palette: Palette,
) -> Result<(Vec<Sourced<T>>, usize), CliError> {
    let total = results.len();
    let mut ok = Vec::with_capacity(total);
    let mut failed = 0;

    for (source, result) in results {
        match result {
            Ok(item) => ok.push(Sourced { source, item }),
            Err(err) if total == 1 => return Err(err),
            Err(err) => {
                output::print_device_error(&source, &err, palette);
                failed += 1;
            }
        }
    }
    Ok((ok, failed))
}

pub(crate) fn fleet_outcome(failed: usize, total: usize) -> Result<(), CliError> {
    if failed == 0 {
        Ok(())
    } else {
        Err(CliError::FleetIncomplete { failed, total })
    }
}
