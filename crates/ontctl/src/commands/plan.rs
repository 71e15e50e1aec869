//! `ontctl plan`: build plans for every device without writing anything.

use std::sync::Arc;

use ontctl_core::Reconciler;

use super::{fleet_outcome, load_device, load_policy, run_fleet, settle};
use crate::cli::{GlobalOpts, RunArgs};
use crate::config::Settings;
use crate::error::CliError;
use crate::output::{self, Palette};

pub async fn handle(args: RunArgs, settings: &Settings, global: &GlobalOpts) -> Result<(), CliError> {
    let reconciler = Reconciler::new(settings.engine.clone());
    let policy = Arc::new(reconciler.validate(&load_policy(&args.policy)?));
    if !policy.is_clean() {
        tracing::info!(errors = policy.errors.len(), "policy has invalid fields; valid sections still apply");
    }

    let results = run_fleet(&args.devices, |path| {
        let reconciler = reconciler.clone();
        let policy = Arc::clone(&policy);
        async move {
            let store = load_device(&path)?;
            Ok(reconciler.plan_policy(&store, &policy).await?)
        }
    })
    .await;

    let palette = Palette::new(settings.color);
    let (plans, failed) = settle(results, palette)?;
    let rendered = output::render_plans(settings.output, &plans, palette)?;
    output::print_output(&rendered, global.quiet);
    fleet_outcome(failed, args.devices.len())
}
