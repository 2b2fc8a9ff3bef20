//! Clap derive structures for the `vaultwatch` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use vaultwatch_core::Command as DeviceCommand;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// vaultwatch -- live monitor and remote control for a vault-room door
#[derive(Debug, Parser)]
#[command(
    name = "vaultwatch",
    version,
    about = "Monitor the vault-room door controller and send it commands",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, short = 'C', env = "VAULTWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Dashboard tables (default)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll continuously and redraw the dashboard; type command tokens to send them
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Fetch once and print the dashboard
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Send one command to the door controller
    Send(SendArgs),

    /// Inspect or create the configuration file
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Refresh interval in seconds (overrides config)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,

    /// Access-log rows to show
    #[arg(long, default_value = "10")]
    pub history: usize,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Access-log rows to show
    #[arg(long, default_value = "10")]
    pub history: usize,
}

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Command token: LED_ROUGE, LED_VERTE, OPEN, CLOSE or RESET
    #[arg(value_parser = parse_device_command)]
    pub command: DeviceCommand,
}

/// Parse a command token with the core vocabulary.
pub fn parse_device_command(raw: &str) -> Result<DeviceCommand, String> {
    DeviceCommand::parse_token(&raw.to_ascii_uppercase()).map_err(|e| e.to_string())
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Show the effective configuration (secrets masked)
    Show,

    /// Write a starter config file
    Init(InitArgs),
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Data backend
    #[arg(long, default_value = "firebase")]
    pub backend: BackendKind,

    /// Firebase database URL or gateway base URL
    #[arg(long)]
    pub url: Option<String>,

    /// MQTT broker host (commands go through the gateway when omitted with --backend gateway)
    #[arg(long)]
    pub mqtt_host: Option<String>,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    Firebase,
    Gateway,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Firebase => "firebase",
            Self::Gateway => "gateway",
        }
    }
}
