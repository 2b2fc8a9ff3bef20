//! Configuration for vaultwatch.
//!
//! TOML file + environment layering, secret resolution (env var or
//! plaintext), and translation to `vaultwatch_core::MonitorConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use vaultwatch_core::{BackendConfig, CommandConfig, MonitorConfig, RefreshConfig, TlsVerification};

/// Prefix for environment overrides, e.g. `VAULTWATCH_REFRESH__INTERVAL_SECS`.
pub const ENV_PREFIX: &str = "VAULTWATCH_";

/// Fallback variable for the Firebase token when `auth_token_env` is unset.
pub const DEFAULT_TOKEN_ENV: &str = "VAULTWATCH_FIREBASE_TOKEN";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub firebase: FirebaseSection,
    #[serde(default)]
    pub gateway: GatewaySection,
    #[serde(default)]
    pub commands: CommandsSection,
    #[serde(default)]
    pub mqtt: MqttSection,
    #[serde(default)]
    pub refresh: RefreshSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BackendSection {
    /// "firebase" or "gateway".
    #[serde(default = "default_backend_kind")]
    pub kind: String,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            kind: default_backend_kind(),
        }
    }
}

fn default_backend_kind() -> String {
    "firebase".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FirebaseSection {
    /// Realtime Database root, e.g. "https://<project>-default-rtdb.firebaseio.com".
    pub database_url: Option<String>,

    #[serde(default = "default_log_path")]
    pub log_path: String,

    #[serde(default = "default_env_path")]
    pub env_path: String,

    /// Database secret or ID token (plaintext; prefer `auth_token_env`).
    pub auth_token: Option<String>,

    /// Environment variable holding the token.
    pub auth_token_env: Option<String>,
}

impl Default for FirebaseSection {
    fn default() -> Self {
        Self {
            database_url: None,
            log_path: default_log_path(),
            env_path: default_env_path(),
            auth_token: None,
            auth_token_env: None,
        }
    }
}

fn default_log_path() -> String {
    "access_logs".into()
}
fn default_env_path() -> String {
    "data_logs".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GatewaySection {
    /// Gateway base URL, e.g. "http://192.168.1.50:8080/api".
    pub base_url: Option<String>,

    #[serde(default = "default_gateway_logs")]
    pub log_path: String,

    #[serde(default = "default_gateway_env")]
    pub env_path: String,

    #[serde(default = "default_gateway_command")]
    pub command_path: String,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Accept self-signed certificates.
    #[serde(default)]
    pub insecure: bool,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            base_url: None,
            log_path: default_gateway_logs(),
            env_path: default_gateway_env(),
            command_path: default_gateway_command(),
            ca_cert: None,
            insecure: false,
        }
    }
}

fn default_gateway_logs() -> String {
    "logs".into()
}
fn default_gateway_env() -> String {
    "env".into()
}
fn default_gateway_command() -> String {
    "command".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommandsSection {
    /// "mqtt" or "gateway".
    #[serde(default = "default_transport")]
    pub transport: String,
}

impl Default for CommandsSection {
    fn default() -> Self {
        Self {
            transport: default_transport(),
        }
    }
}

fn default_transport() -> String {
    "mqtt".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MqttSection {
    #[serde(default = "default_mqtt_host")]
    pub host: String,

    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    #[serde(default = "default_mqtt_topic")]
    pub topic: String,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
}

impl Default for MqttSection {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            topic: default_mqtt_topic(),
            client_id: default_client_id(),
            keep_alive_secs: default_keep_alive(),
        }
    }
}

fn default_mqtt_host() -> String {
    "localhost".into()
}
fn default_mqtt_port() -> u16 {
    1883
}
fn default_mqtt_topic() -> String {
    "salle_forte/commande".into()
}
fn default_client_id() -> String {
    "vaultwatch".into()
}
fn default_keep_alive() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RefreshSection {
    /// Seconds between refresh cycles; 0 disables auto-refresh.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Per-request timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_fetch_retries")]
    pub fetch_retries: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Environment readings kept per snapshot; 0 keeps everything.
    #[serde(default = "default_env_history")]
    pub env_history_limit: u32,
}

impl Default for RefreshSection {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            timeout_secs: default_timeout(),
            fetch_retries: default_fetch_retries(),
            retry_delay_ms: default_retry_delay(),
            env_history_limit: default_env_history(),
        }
    }
}

fn default_interval() -> u64 {
    3
}
fn default_timeout() -> u64 {
    5
}
fn default_fetch_retries() -> u32 {
    1
}
fn default_retry_delay() -> u64 {
    250
}
fn default_env_history() -> u32 {
    500
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "vaultwatch", "vaultwatch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("vaultwatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Layered provider: defaults, then the TOML file, then `VAULTWATCH_*`.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load the full Config from `path` (or the platform default) + environment.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    let config: Config = figment(&path).extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to pretty TOML and write it to `path`.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Secret resolution ───────────────────────────────────────────────

/// Resolve the Firebase token: `auth_token_env`, then
/// [`DEFAULT_TOKEN_ENV`], then plaintext. `None` for a public database.
pub fn resolve_auth_token(firebase: &FirebaseSection) -> Option<SecretString> {
    let env_name = firebase
        .auth_token_env
        .as_deref()
        .unwrap_or(DEFAULT_TOKEN_ENV);
    if let Ok(val) = std::env::var(env_name) {
        if !val.is_empty() {
            return Some(SecretString::from(val));
        }
    }

    firebase
        .auth_token
        .as_ref()
        .filter(|t| !t.is_empty())
        .map(|t| SecretString::from(t.clone()))
}

// ── Translation ─────────────────────────────────────────────────────

fn parse_url(field: &str, raw: Option<&str>) -> Result<Url, ConfigError> {
    let raw = raw
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| invalid(field, "required"))?;
    let url: Url = raw
        .trim()
        .parse()
        .map_err(|e| invalid(field, format!("invalid URL '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(field, format!("unsupported scheme '{other}'"))),
    }
}

fn require_path(field: &str, value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    Ok(trimmed.to_owned())
}

fn backend_config(cfg: &Config) -> Result<BackendConfig, ConfigError> {
    match cfg.backend.kind.as_str() {
        "firebase" => Ok(BackendConfig::Firebase {
            database_url: parse_url(
                "firebase.database_url",
                cfg.firebase.database_url.as_deref(),
            )?,
            log_path: require_path("firebase.log_path", &cfg.firebase.log_path)?,
            env_path: require_path("firebase.env_path", &cfg.firebase.env_path)?,
            auth_token: resolve_auth_token(&cfg.firebase),
        }),
        "gateway" => Ok(BackendConfig::Gateway {
            base_url: parse_url("gateway.base_url", cfg.gateway.base_url.as_deref())?,
            log_path: require_path("gateway.log_path", &cfg.gateway.log_path)?,
            env_path: require_path("gateway.env_path", &cfg.gateway.env_path)?,
        }),
        other => Err(invalid(
            "backend.kind",
            format!("expected 'firebase' or 'gateway', got '{other}'"),
        )),
    }
}

fn command_config(cfg: &Config) -> Result<CommandConfig, ConfigError> {
    match cfg.commands.transport.as_str() {
        "mqtt" => {
            let mqtt = &cfg.mqtt;
            if mqtt.host.trim().is_empty() {
                return Err(invalid("mqtt.host", "must not be empty"));
            }
            if mqtt.port == 0 {
                return Err(invalid("mqtt.port", "must be non-zero"));
            }
            if mqtt.topic.trim().is_empty() || mqtt.topic.contains(['+', '#']) {
                return Err(invalid(
                    "mqtt.topic",
                    format!("'{}' is not a publishable topic", mqtt.topic),
                ));
            }
            Ok(CommandConfig::Mqtt {
                host: mqtt.host.trim().to_owned(),
                port: mqtt.port,
                topic: mqtt.topic.clone(),
                client_id: mqtt.client_id.clone(),
                keep_alive: Duration::from_secs(mqtt.keep_alive_secs),
            })
        }
        "gateway" => Ok(CommandConfig::Gateway {
            base_url: parse_url("gateway.base_url", cfg.gateway.base_url.as_deref())?,
            command_path: require_path("gateway.command_path", &cfg.gateway.command_path)?,
        }),
        other => Err(invalid(
            "commands.transport",
            format!("expected 'mqtt' or 'gateway', got '{other}'"),
        )),
    }
}

fn tls_config(gateway: &GatewaySection) -> TlsVerification {
    if gateway.insecure {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = gateway.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    }
}

/// Validate the loaded file and build a `MonitorConfig`.
pub fn to_monitor_config(cfg: &Config) -> Result<MonitorConfig, ConfigError> {
    let refresh = &cfg.refresh;
    if refresh.timeout_secs == 0 {
        return Err(invalid("refresh.timeout_secs", "must be at least 1"));
    }

    Ok(MonitorConfig {
        backend: backend_config(cfg)?,
        commands: command_config(cfg)?,
        refresh: RefreshConfig {
            interval: Duration::from_secs(refresh.interval_secs),
            fetch_retries: refresh.fetch_retries,
            retry_delay: Duration::from_millis(refresh.retry_delay_ms),
        },
        timeout: Duration::from_secs(refresh.timeout_secs),
        tls: tls_config(&cfg.gateway),
        env_history_limit: refresh.env_history_limit,
    })
}
