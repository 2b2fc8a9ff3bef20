mod cli;
mod commands;
mod error;
mod output;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vaultwatch_config::Config;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // stdout carries the dashboard; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands never touch the network
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        cmd => {
            let (cfg, path) = load(&cli.global)?;
            let monitor_config = vaultwatch_config::to_monitor_config(&cfg)
                .map_err(|e| CliError::from_config(e, &path))?;

            tracing::debug!(command = ?cmd, backend = %cfg.backend.kind, "dispatching command");
            commands::dispatch(cmd, monitor_config, &cli.global).await
        }
    }
}

/// Resolve the config path and load the layered configuration.
pub(crate) fn load(global: &GlobalOpts) -> Result<(Config, PathBuf), CliError> {
    let path = config_file(global);
    let cfg = vaultwatch_config::load_config(Some(&path))
        .map_err(|e| CliError::from_config(e, &path))?;
    Ok((cfg, path))
}

pub(crate) fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(vaultwatch_config::config_path)
}
