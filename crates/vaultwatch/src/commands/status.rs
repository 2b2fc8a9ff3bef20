//! One-shot dashboard fetch.

use vaultwatch_core::{Backend, MonitorConfig, RefreshStatus, fetch_snapshot};

use crate::cli::{GlobalOpts, StatusArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    config: &MonitorConfig,
    args: &StatusArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    // Only the data streams are needed, so no command transport is built.
    let backend = Backend::from_config(config)?;
    let snapshot = fetch_snapshot(&backend, &backend, &config.refresh).await?;

    let status = RefreshStatus::Fresh {
        at: snapshot.fetched_at,
    };
    let rendered = output::render_dashboard(
        global.output,
        Some(&snapshot),
        &status,
        args.history,
        output::should_color(global.color),
    )?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
