//! `ontctl read`: resolve capabilities against one device and print their
//! current values.

use ontctl_core::{CapabilityKey, Reconciler};

use super::load_device;
use crate::cli::{GlobalOpts, ReadArgs};
use crate::config::Settings;
use crate::error::CliError;
use crate::output::{self, CapabilityValue};

pub async fn handle(args: ReadArgs, settings: &Settings, global: &GlobalOpts) -> Result<(), CliError> {
    let reconciler = Reconciler::new(settings.engine.clone());
    let store = load_device(&args.device)?;

    let mut values = Vec::with_capacity(args.keys.len());
    for raw in args.keys {
        let key = CapabilityKey::new(raw.trim());
        let value = reconciler.read_capability(&store, &key).await?;
        values.push(CapabilityValue {
            capability: key.to_string(),
            value,
        });
    }

    let rendered = output::render_list(
        settings.output,
        &values,
        output::capability_row,
        output::capability_line,
    )?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
