//! Single command dispatch.

use std::time::Duration;

use serde::Serialize;

use vaultwatch_core::{ConfiguredMonitor, MonitorConfig};

use crate::cli::{GlobalOpts, OutputFormat, SendArgs};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct SendReport {
    command: &'static str,
    delivered: bool,
}

pub async fn handle(
    mut config: MonitorConfig,
    args: &SendArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    // No ticker: this run only carries one command.
    config.refresh.interval = Duration::ZERO;
    let monitor = ConfiguredMonitor::from_config(&config)?;

    monitor.start().await;
    let result = monitor.dispatch(args.command).await;
    monitor.shutdown().await;
    result?;

    let report = SendReport {
        command: args.command.token(),
        delivered: true,
    };
    let rendered = match global.output {
        OutputFormat::Table => format!("Sent {}", report.command),
        OutputFormat::Json => serde_json::to_string_pretty(&report)?,
        OutputFormat::JsonCompact => serde_json::to_string(&report)?,
    };
    output::print_output(&rendered, global.quiet);
    Ok(())
}
