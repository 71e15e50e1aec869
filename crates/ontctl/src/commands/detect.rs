//! `ontctl detect`: vendor and schema identification only.

use ontctl_core::Reconciler;

use super::{fleet_outcome, load_device, run_fleet, settle};
use crate::cli::{DetectArgs, GlobalOpts};
use crate::config::Settings;
use crate::error::CliError;
use crate::output::{self, Palette};

pub async fn handle(
    args: DetectArgs,
    settings: &Settings,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let reconciler = Reconciler::new(settings.engine.clone());

    let results = run_fleet(&args.devices, |path| {
        let reconciler = reconciler.clone();
        async move {
            let store = load_device(&path)?;
            Ok(reconciler.detect(&store).await?)
        }
    })
    .await;

    let (devices, failed) = settle(results, Palette::new(settings.color))?;
    let rendered =
        output::render_list(settings.output, &devices, output::detect_row, output::detect_line)?;
    output::print_output(&rendered, global.quiet);
    fleet_outcome(failed, args.devices.len())
}
