//! Command dispatch: bridges CLI args -> core monitor -> output formatting.

pub mod config_cmd;
pub mod send;
pub mod status;
pub mod watch;

use vaultwatch_core::MonitorConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    config: MonitorConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Watch(args) => watch::handle(config, args, global).await,
        Command::Status(args) => status::handle(&config, &args, global).await,
        Command::Send(args) => send::handle(config, &args, global).await,
        // Config is handled before dispatch
        Command::Config(_) => unreachable!(),
    }
}
