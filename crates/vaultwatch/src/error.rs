//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use vaultwatch_config::ConfigError;
use vaultwatch_core::{Command, CoreError, Stream};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NO_DATA: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const DISPATCH: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Backend ──────────────────────────────────────────────────────
    #[error("Could not fetch {stream}: {reason}")]
    #[diagnostic(
        code(vaultwatch::fetch_failed),
        help(
            "Check that the backend is reachable and the URL in your config is right.\n\
             Run: vaultwatch config show"
        )
    )]
    FetchFailed { stream: Stream, reason: String },

    #[error("No {stream} recorded yet")]
    #[diagnostic(
        code(vaultwatch::no_data),
        help("The backend answered but the collection is empty. Check log_path / env_path.")
    )]
    NoData { stream: Stream },

    // ── Commands ─────────────────────────────────────────────────────
    #[error("Command {command} was not delivered: {reason}")]
    #[diagnostic(
        code(vaultwatch::dispatch_failed),
        help("Nothing was retried. Check the broker or gateway and send the command again.")
    )]
    DispatchFailed { command: Command, reason: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(vaultwatch::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid configuration: {field}: {reason}")]
    #[diagnostic(
        code(vaultwatch::config_invalid),
        help(
            "Fix the value in {path} or override it with VAULTWATCH_<SECTION>__<KEY>.\n\
             Create a starter file with: vaultwatch config init"
        )
    )]
    ConfigInvalid {
        field: String,
        reason: String,
        path: String,
    },

    #[error("Failed to load configuration: {message}")]
    #[diagnostic(code(vaultwatch::config))]
    ConfigLoad { message: String },

    #[error("Config file already exists at {path}")]
    #[diagnostic(
        code(vaultwatch::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Monitor is not running")]
    #[diagnostic(code(vaultwatch::stopped))]
    Stopped,

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(vaultwatch::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FetchFailed { .. } => exit_code::CONNECTION,
            Self::NoData { .. } => exit_code::NO_DATA,
            Self::DispatchFailed { .. } => exit_code::DISPATCH,
            Self::Validation { .. } | Self::ConfigInvalid { .. } | Self::ConfigExists { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the config file path to a configuration error.
    pub fn from_config(err: ConfigError, path: &std::path::Path) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::ConfigInvalid {
                field,
                reason,
                path: path.display().to_string(),
            },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::ConfigLoad {
                message: other.to_string(),
            },
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Fetch { stream, reason, .. } => Self::FetchFailed { stream, reason },
            CoreError::NoData { stream } => Self::NoData { stream },
            CoreError::CommandDispatch { command, reason } => {
                Self::DispatchFailed { command, reason }
            }
            CoreError::MonitorStopped => Self::Stopped,
            CoreError::ValidationFailed { message } => Self::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::Config { message } => Self::ConfigLoad { message },
        }
    }
}
