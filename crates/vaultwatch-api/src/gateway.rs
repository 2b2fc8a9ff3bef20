// REST gateway client
//
// The gateway fronts the device with three plain JSON endpoints: a log
// array, an environment document (one reading or an array of them), and
// a command endpoint taking `{"cmd": <token>}`.

use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::firebase::parse_json;
use crate::models::{RawAccessLog, RawEnvReading, RecordSet};
use crate::transport::{TransportConfig, join_path};

/// Endpoint paths, relative to the gateway base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayPaths {
    pub logs: String,
    pub env: String,
    pub command: String,
}

impl Default for GatewayPaths {
    fn default() -> Self {
        Self {
            logs: "logs".into(),
            env: "env".into(),
            command: "command".into(),
        }
    }
}

#[derive(Serialize)]
struct CommandBody<'a> {
    cmd: &'a str,
}

/// HTTP client for the REST gateway.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: Url,
    paths: GatewayPaths,
    timeout: std::time::Duration,
}

impl GatewayClient {
    pub fn new(base_url: Url, paths: GatewayPaths, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            paths,
            timeout: transport.timeout,
        })
    }

    /// Create a gateway client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, paths: GatewayPaths) -> Self {
        Self {
            http,
            base_url,
            paths,
            timeout: crate::transport::DEFAULT_TIMEOUT,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET {base}/{logs}` -- JSON array of access-log records.
    pub async fn list_access_logs(&self) -> Result<RecordSet<RawAccessLog>, Error> {
        let url = join_path(&self.base_url, &self.paths.logs)?;
        debug!("GET {url}");
        let value = self.get_json(url).await?;
        RecordSet::from_array(value)
    }

    /// `GET {base}/{env}` -- a single reading object or an array of readings.
    pub async fn list_env_readings(&self) -> Result<RecordSet<RawEnvReading>, Error> {
        let url = join_path(&self.base_url, &self.paths.env)?;
        debug!("GET {url}");
        let value = self.get_json(url).await?;
        RecordSet::from_document(value)
    }

    /// `POST {base}/{command}` with `{"cmd": token}`.
    ///
    /// Any 2xx counts as accepted; the response body is ignored.
    pub async fn send_command(&self, token: &str) -> Result<(), Error> {
        let url = join_path(&self.base_url, &self.paths.command)?;
        debug!(token, "POST {url}");

        let resp = self
            .http
            .post(url)
            .json(&CommandBody { cmd: token })
            .send()
            .await
            .map_err(|e| Error::from_send(e, self.timeout))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(Error::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json(&self, url: Url) -> Result<serde_json::Value, Error> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::from_send(e, self.timeout))?;
        parse_json(resp, self.timeout).await
    }
}
