//! Live dashboard: redraws on every published view and reads command
//! tokens from stdin.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use vaultwatch_core::{ConfiguredMonitor, MonitorConfig};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs, parse_device_command};
use crate::error::CliError;
use crate::output;

/// What one stdin line asks for.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Skip,
    Quit,
    Refresh,
    Send(vaultwatch_core::Command),
    Invalid(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Skip;
    }
    if line.eq_ignore_ascii_case("q") || line.eq_ignore_ascii_case("quit") {
        return Input::Quit;
    }
    if line.eq_ignore_ascii_case("r") || line.eq_ignore_ascii_case("refresh") {
        return Input::Refresh;
    }
    match parse_device_command(line) {
        Ok(command) => Input::Send(command),
        Err(reason) => Input::Invalid(reason),
    }
}

pub async fn handle(
    mut config: MonitorConfig,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(secs) = args.interval {
        config.refresh.interval = Duration::from_secs(secs);
    }
    let color = output::should_color(global.color);

    let monitor = ConfiguredMonitor::from_config(&config)?;
    let mut views = monitor.subscribe();
    monitor.start().await;

    if config.refresh.interval.is_zero() {
        spawn_refresh(&monitor);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = loop {
        tokio::select! {
            _ = &mut ctrl_c => break Ok(()),

            changed = views.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let view = views.borrow_and_update().clone();
                let rendered = match output::render_dashboard(
                    global.output,
                    view.snapshot.as_deref(),
                    &view.status,
                    args.history,
                    color,
                ) {
                    Ok(rendered) => rendered,
                    Err(e) => break Err(e),
                };
                if global.output == OutputFormat::Table {
                    if let Err(e) = output::clear_screen() {
                        break Err(e.into());
                    }
                }
                output::print_output(&rendered, global.quiet);
            }

            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match parse_input(&line) {
                    Input::Skip => {}
                    Input::Quit => break Ok(()),
                    Input::Refresh => spawn_refresh(&monitor),
                    Input::Send(command) => spawn_dispatch(&monitor, command),
                    Input::Invalid(reason) => eprintln!("{reason}"),
                },
                Ok(None) => {
                    debug!("stdin closed, watching only");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!(error = %e, "stdin read failed, watching only");
                    stdin_open = false;
                }
            },
        }
    };

    monitor.shutdown().await;
    result
}

fn spawn_refresh(monitor: &ConfiguredMonitor) {
    let monitor = monitor.clone();
    tokio::spawn(async move {
        // The store records the failure; the redraw shows it.
        if let Err(e) = monitor.refresh_now().await {
            debug!(error = %e, "manual refresh failed");
        }
    });
}

// Dispatch runs beside the redraw loop so a slow broker never blocks it.
fn spawn_dispatch(monitor: &ConfiguredMonitor, command: vaultwatch_core::Command) {
    let monitor = monitor.clone();
    tokio::spawn(async move {
        match monitor.dispatch(command).await {
            Ok(()) => eprintln!("Sent {command}"),
            Err(e) => eprintln!("{:?}", miette::Report::new(CliError::from(e))),
        }
    });
}

#[cfg(test)]
mod tests {
    use vaultwatch_core::Command;

    use super::*;

    #[test]
    fn stdin_lines_map_to_actions() {
        assert_eq!(parse_input("   "), Input::Skip);
        assert_eq!(parse_input("quit"), Input::Quit);
        assert_eq!(parse_input("R"), Input::Refresh);
        assert_eq!(parse_input(" open \n"), Input::Send(Command::Open));
        assert_eq!(parse_input("LED_ROUGE"), Input::Send(Command::LedRouge));
        assert!(matches!(parse_input("UNLOCK"), Input::Invalid(_)));
    }
}
