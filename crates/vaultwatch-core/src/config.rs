// ── Runtime monitor configuration ──
//
// These types describe *where* data comes from and *how* often to poll.
// They carry connection data and tuning, but never touch disk.
// The binary builds a `MonitorConfig` (via vaultwatch-config) and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Where the access-log and environment streams are read from.
#[derive(Debug, Clone)]
pub enum BackendConfig {
    /// Firebase Realtime Database, read through its REST surface.
    Firebase {
        database_url: Url,
        log_path: String,
        env_path: String,
        /// Database secret or ID token sent as the `auth` query parameter.
        auth_token: Option<SecretString>,
    },
    /// REST gateway in front of the device.
    Gateway {
        base_url: Url,
        log_path: String,
        env_path: String,
    },
}

/// Where operator commands are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandConfig {
    /// Publish the token on an MQTT topic.
    Mqtt {
        host: String,
        port: u16,
        topic: String,
        client_id: String,
        keep_alive: Duration,
    },
    /// `POST {"cmd": token}` to the gateway.
    Gateway { base_url: Url, command_path: String },
}

/// TLS verification strategy for HTTPS backends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict). Default: Firebase serves public certificates.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed gateway).
    DangerAcceptInvalid,
}

/// Refresh cadence and fetch resilience.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshConfig {
    /// Tick interval. Zero disables the background ticker (manual refresh only).
    pub interval: Duration,
    /// Extra attempts for transient fetch errors within one cycle.
    pub fetch_retries: u32,
    /// Pause between attempts.
    pub retry_delay: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            fetch_retries: 1,
            retry_delay: Duration::from_millis(250),
        }
    }
}

/// Full configuration for one monitored installation.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub backend: BackendConfig,
    pub commands: CommandConfig,
    pub refresh: RefreshConfig,
    /// Per-request transport timeout (HTTP calls and MQTT publishes).
    pub timeout: Duration,
    pub tls: TlsVerification,
    /// Maximum number of environment readings kept per snapshot.
    pub env_history_limit: u32,
}
