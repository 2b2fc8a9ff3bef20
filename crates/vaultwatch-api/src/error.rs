use thiserror::Error;

/// Top-level error type for the `vaultwatch-api` crate.
///
/// Covers every failure mode across the backend surfaces: HTTP transport,
/// the Firebase and gateway payloads, and the MQTT command link.
/// `vaultwatch-core` maps these into fetch / dispatch errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Backend ─────────────────────────────────────────────────────
    /// Non-success HTTP status from the database or gateway.
    #[error("Backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── MQTT ────────────────────────────────────────────────────────
    /// The broker link is down; the publish was not queued.
    #[error("MQTT broker unavailable: {reason}")]
    BrokerUnavailable { reason: String },

    /// The MQTT client rejected the request.
    #[error("MQTT client error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::BrokerUnavailable { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the request ran into the client-side timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout(),
            Self::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Map a send-side `reqwest` error, promoting timeouts to [`Error::Timeout`].
    pub(crate) fn from_send(err: reqwest::Error, timeout: std::time::Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                timeout_secs: timeout.as_secs(),
            }
        } else {
            Self::Transport(err)
        }
    }
}
