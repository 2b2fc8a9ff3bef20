// ── Concrete adapters ──
//
// One adapter per backend, each implementing the capability traits over
// a vaultwatch-api client. `Backend` and `CommandTransport` select the
// adapter from configuration so the monitor stays monomorphic.

use std::sync::Arc;

use tracing::{debug, info};

use vaultwatch_api::{
    GatewayClient, GatewayPaths, MqttPublisher, MqttSettings, RtdbClient, TlsMode, TransportConfig,
};

use crate::command::Command;
use crate::config::{BackendConfig, CommandConfig, MonitorConfig, TlsVerification};
use crate::convert;
use crate::error::{CoreError, Stream};
use crate::model::{EnvBatch, LogBatch};
use crate::projector::retain_newest;
use crate::source::{CommandSink, EnvSource, LogSource};

// ── Firebase ─────────────────────────────────────────────────────────

/// Reads both streams from a Firebase Realtime Database.
#[derive(Debug, Clone)]
pub struct FirebaseBackend {
    client: RtdbClient,
    log_path: String,
    env_path: String,
    env_limit: u32,
}

impl FirebaseBackend {
    pub fn new(client: RtdbClient, log_path: String, env_path: String, env_limit: u32) -> Self {
        Self {
            client,
            log_path,
            env_path,
            env_limit,
        }
    }
}

impl LogSource for FirebaseBackend {
    async fn fetch_logs(&self) -> Result<LogBatch, CoreError> {
        let set = self
            .client
            .list_access_logs(&self.log_path)
            .await
            .map_err(|e| CoreError::fetch(Stream::AccessLogs, &e))?;
        Ok(convert::access_logs(set))
    }
}

impl EnvSource for FirebaseBackend {
    async fn fetch_env(&self) -> Result<EnvBatch, CoreError> {
        let limit = (self.env_limit > 0).then_some(self.env_limit);
        let set = self
            .client
            .list_env_readings(&self.env_path, limit)
            .await
            .map_err(|e| CoreError::fetch(Stream::Environment, &e))?;
        let mut batch = convert::env_readings(set);
        retain_newest(&mut batch.readings, self.env_limit);
        Ok(batch)
    }
}

// ── REST gateway ─────────────────────────────────────────────────────

/// Reads both streams from the REST gateway.
#[derive(Debug, Clone)]
pub struct GatewayBackend {
    client: GatewayClient,
    env_limit: u32,
}

impl GatewayBackend {
    pub fn new(client: GatewayClient, env_limit: u32) -> Self {
        Self { client, env_limit }
    }
}

impl LogSource for GatewayBackend {
    async fn fetch_logs(&self) -> Result<LogBatch, CoreError> {
        let set = self
            .client
            .list_access_logs()
            .await
            .map_err(|e| CoreError::fetch(Stream::AccessLogs, &e))?;
        Ok(convert::access_logs(set))
    }
}

impl EnvSource for GatewayBackend {
    async fn fetch_env(&self) -> Result<EnvBatch, CoreError> {
        let set = self
            .client
            .list_env_readings()
            .await
            .map_err(|e| CoreError::fetch(Stream::Environment, &e))?;
        let mut batch = convert::env_readings(set);
        retain_newest(&mut batch.readings, self.env_limit);
        Ok(batch)
    }
}

// ── Backend selection ────────────────────────────────────────────────

/// Data backend chosen by configuration.
#[derive(Debug, Clone)]
pub enum Backend {
    Firebase(FirebaseBackend),
    Gateway(GatewayBackend),
}

impl Backend {
    /// Build the configured backend client. Performs no network I/O.
    pub fn from_config(config: &MonitorConfig) -> Result<Self, CoreError> {
        let transport = build_transport(config);

        match &config.backend {
            BackendConfig::Firebase {
                database_url,
                log_path,
                env_path,
                auth_token,
            } => {
                let client = RtdbClient::new(database_url.clone(), auth_token.clone(), &transport)?;
                info!(url = %database_url, "using Firebase backend");
                Ok(Self::Firebase(FirebaseBackend::new(
                    client,
                    log_path.clone(),
                    env_path.clone(),
                    config.env_history_limit,
                )))
            }
            BackendConfig::Gateway {
                base_url,
                log_path,
                env_path,
            } => {
                let paths = GatewayPaths {
                    logs: log_path.clone(),
                    env: env_path.clone(),
                    ..GatewayPaths::default()
                };
                let client = GatewayClient::new(base_url.clone(), paths, &transport)?;
                info!(url = %base_url, "using REST gateway backend");
                Ok(Self::Gateway(GatewayBackend::new(
                    client,
                    config.env_history_limit,
                )))
            }
        }
    }
}

impl LogSource for Backend {
    async fn fetch_logs(&self) -> Result<LogBatch, CoreError> {
        match self {
            Self::Firebase(b) => b.fetch_logs().await,
            Self::Gateway(b) => b.fetch_logs().await,
        }
    }
}

impl EnvSource for Backend {
    async fn fetch_env(&self) -> Result<EnvBatch, CoreError> {
        match self {
            Self::Firebase(b) => b.fetch_env().await,
            Self::Gateway(b) => b.fetch_env().await,
        }
    }
}

// ── Command transport ────────────────────────────────────────────────

/// Command sink chosen by configuration.
#[derive(Debug, Clone)]
pub enum CommandTransport {
    Mqtt(Arc<MqttPublisher>),
    Gateway(GatewayClient),
}

impl CommandTransport {
    /// Build the configured command transport.
    ///
    /// The MQTT variant spawns its event loop, so this must run inside a
    /// Tokio runtime.
    pub fn from_config(config: &MonitorConfig) -> Result<Self, CoreError> {
        match &config.commands {
            CommandConfig::Mqtt {
                host,
                port,
                topic,
                client_id,
                keep_alive,
            } => {
                let settings = MqttSettings {
                    host: host.clone(),
                    port: *port,
                    client_id: client_id.clone(),
                    topic: topic.clone(),
                    keep_alive: *keep_alive,
                    publish_timeout: config.timeout,
                };
                info!(%host, port, %topic, "using MQTT command transport");
                Ok(Self::Mqtt(Arc::new(MqttPublisher::connect(settings))))
            }
            CommandConfig::Gateway {
                base_url,
                command_path,
            } => {
                let paths = GatewayPaths {
                    command: command_path.clone(),
                    ..GatewayPaths::default()
                };
                let client = GatewayClient::new(base_url.clone(), paths, &build_transport(config))?;
                info!(url = %base_url, "using REST command transport");
                Ok(Self::Gateway(client))
            }
        }
    }
}

impl CommandSink for CommandTransport {
    async fn dispatch(&self, command: Command) -> Result<(), CoreError> {
        let result = match self {
            Self::Mqtt(publisher) => publisher.publish(command.token()).await,
            Self::Gateway(client) => client.send_command(command.token()).await,
        };
        result.map_err(|e| CoreError::dispatch(command, &e))
    }

    async fn shutdown(&self) {
        if let Self::Mqtt(publisher) = self {
            debug!("closing MQTT session");
            publisher.disconnect().await;
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Build a [`TransportConfig`] from the monitor configuration.
fn build_transport(config: &MonitorConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
