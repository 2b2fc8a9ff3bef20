// ── Core error types ──
//
// User-facing errors from vaultwatch-core. Consumers never see HTTP
// status codes or JSON parse failures directly: adapters translate
// `vaultwatch_api::Error` into fetch and dispatch variants tagged with
// the stream or command they belong to.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::command::Command;

/// The two independent event streams the dashboard polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stream {
    AccessLogs,
    Environment,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessLogs => f.write_str("access logs"),
            Self::Environment => f.write_str("environment"),
        }
    }
}

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Data errors ──────────────────────────────────────────────────
    #[error("Failed to fetch {stream}: {reason}")]
    Fetch {
        stream: Stream,
        reason: String,
        /// Timeouts, refused connections, 5xx: worth another attempt.
        transient: bool,
    },

    #[error("No {stream} data available")]
    NoData { stream: Stream },

    // ── Command errors ───────────────────────────────────────────────
    #[error("Command {command} was not delivered: {reason}")]
    CommandDispatch { command: Command, reason: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Monitor is not running")]
    MonitorStopped,

    // ── Input / configuration ────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Wrap a transport error raised while fetching `stream`.
    pub fn fetch(stream: Stream, err: &vaultwatch_api::Error) -> Self {
        Self::Fetch {
            stream,
            reason: err.to_string(),
            transient: err.is_transient(),
        }
    }

    /// Wrap a transport error raised while sending `command`.
    pub fn dispatch(command: Command, err: &vaultwatch_api::Error) -> Self {
        Self::CommandDispatch {
            command,
            reason: err.to_string(),
        }
    }

    /// Returns `true` if retrying the same operation might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Fetch { transient: true, .. })
    }

    /// The stream this error belongs to, for fetch-side errors.
    pub fn stream(&self) -> Option<Stream> {
        match self {
            Self::Fetch { stream, .. } | Self::NoData { stream } => Some(*stream),
            _ => None,
        }
    }
}

impl From<vaultwatch_api::Error> for CoreError {
    fn from(err: vaultwatch_api::Error) -> Self {
        match err {
            vaultwatch_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            vaultwatch_api::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS setup failed: {msg}"),
            },
            other => CoreError::Config {
                message: other.to_string(),
            },
        }
    }
}
