//! `ontctl apply`: reconcile every device and persist the resulting
//! snapshots.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ontctl_api::MemoryStore;
use ontctl_core::{Reconciler, RunReport};

use super::{fleet_outcome, load_device, load_policy, run_fleet, settle, source_name};
use crate::cli::{ApplyArgs, GlobalOpts};
use crate::config::Settings;
use crate::error::CliError;
use crate::output::{self, Palette};

pub async fn handle(
    args: ApplyArgs,
    settings: &Settings,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let reconciler = Reconciler::new(settings.engine.clone());
    let policy = Arc::new(reconciler.validate(&load_policy(&args.run.policy)?));
    if let Some(dir) = &args.out_dir {
        std::fs::create_dir_all(dir)?;
    }
    let out_dir = args.out_dir;

    let results = run_fleet(&args.run.devices, |path| {
        let reconciler = reconciler.clone();
        let policy = Arc::clone(&policy);
        let target = target_path(&path, out_dir.as_deref());
        async move {
            let store = load_device(&path)?;
            let plan = reconciler.plan_policy(&store, &policy).await?;
            let report = reconciler.apply(&store, plan).await;
            save(&store, &target)?;
            Ok(report)
        }
    })
    .await;

    let palette = Palette::new(settings.color);
    let (reports, failed) = settle(results, palette)?;
    let rendered = output::render_reports(settings.output, &reports, palette)?;
    output::print_output(&rendered, global.quiet);

    fleet_outcome(failed, args.run.devices.len())?;
    let refused: usize = reports.iter().map(|r| refused_count(&r.item)).sum();
    if refused > 0 {
        return Err(CliError::Rejected { count: refused });
    }
    Ok(())
}

/// Where the updated snapshot for `input` is written.
fn target_path(input: &Path, out_dir: Option<&Path>) -> PathBuf {
    match (out_dir, input.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => input.to_path_buf(),
    }
}

fn save(store: &MemoryStore, target: &Path) -> Result<(), CliError> {
    store.save(target).map_err(|e| CliError::Snapshot {
        path: source_name(target),
        reason: e.to_string(),
    })?;
    tracing::debug!(path = %target.display(), "snapshot saved");
    Ok(())
}

fn refused_count(report: &RunReport) -> usize {
    report.failures().count() + report.failed_tags.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_dir_keeps_file_name() {
        let input = Path::new("fleet/ont-01.json");
        assert_eq!(
            target_path(input, Some(Path::new("applied"))),
            PathBuf::from("applied/ont-01.json")
        );
        assert_eq!(target_path(input, None), input.to_path_buf());
    }
}
