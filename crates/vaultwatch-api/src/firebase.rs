// Firebase Realtime Database REST client
//
// Reads collections through the database's REST surface:
// `GET {database_url}/{path}.json` returns the subtree at `path` as JSON,
// or `null` when nothing has ever been written there.

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{RawAccessLog, RawEnvReading, RecordSet};
use crate::transport::{TransportConfig, join_path};

/// Explicitly constructed handle on one Realtime Database instance.
///
/// Created once at process start and shared by reference; there is no
/// process-wide app registry.
#[derive(Clone)]
pub struct RtdbClient {
    http: reqwest::Client,
    database_url: Url,
    auth: Option<SecretString>,
    timeout: std::time::Duration,
}

impl std::fmt::Debug for RtdbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RtdbClient")
            .field("database_url", &self.database_url.as_str())
            .field("auth", &self.auth.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl RtdbClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `auth` is appended as the `auth` query parameter on every request
    /// (database secret or ID token), when present.
    pub fn new(
        database_url: Url,
        auth: Option<SecretString>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            database_url,
            auth,
            timeout: transport.timeout,
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, database_url: Url) -> Self {
        Self {
            http,
            database_url,
            auth: None,
            timeout: crate::transport::DEFAULT_TIMEOUT,
        }
    }

    /// The database root URL.
    pub fn database_url(&self) -> &Url {
        &self.database_url
    }

    // ── Collections ──────────────────────────────────────────────────

    /// Read every access-log record under `path`.
    pub async fn list_access_logs(&self, path: &str) -> Result<RecordSet<RawAccessLog>, Error> {
        debug!(path, "listing access logs");
        self.get_collection(path, None).await
    }

    /// Read environment records under `path`, keeping only the newest
    /// `limit` entries by push key when a limit is given.
    pub async fn list_env_readings(
        &self,
        path: &str,
        limit: Option<u32>,
    ) -> Result<RecordSet<RawEnvReading>, Error> {
        debug!(path, ?limit, "listing environment readings");
        self.get_collection(path, limit).await
    }

    /// `GET {database_url}/{path}.json`, decoded as a keyed collection.
    pub async fn get_collection<T: DeserializeOwned>(
        &self,
        path: &str,
        limit_to_last: Option<u32>,
    ) -> Result<RecordSet<T>, Error> {
        let url = self.collection_url(path, limit_to_last)?;
        debug!("GET {}", redact(&url));

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::from_send(e, self.timeout))?;

        let value = parse_json(resp, self.timeout).await?;
        RecordSet::from_keyed(value)
    }

    // ── URL builders ─────────────────────────────────────────────────

    fn collection_url(&self, path: &str, limit_to_last: Option<u32>) -> Result<Url, Error> {
        let trimmed = path.trim_matches('/');
        let mut url = join_path(&self.database_url, &format!("{trimmed}.json"))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(limit) = limit_to_last {
                query.append_pair("orderBy", "\"$key\"");
                query.append_pair("limitToLast", &limit.to_string());
            }
            if let Some(ref token) = self.auth {
                query.append_pair("auth", token.expose_secret());
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }
}

/// Read a response body as JSON, mapping non-success statuses to [`Error::Status`].
pub(crate) async fn parse_json(
    resp: reqwest::Response,
    timeout: std::time::Duration,
) -> Result<Value, Error> {
    let status = resp.status();
    let body = resp.text().await.map_err(|e| Error::from_send(e, timeout))?;

    if !status.is_success() {
        return Err(Error::Status {
            status: status.as_u16(),
            body,
        });
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&body).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body,
    })
}

/// Strip the `auth` token before a URL reaches the logs.
fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "auth" { "***".to_owned() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    if pairs.is_empty() {
        return shown.to_string();
    }
    shown.query_pairs_mut().clear().extend_pairs(pairs);
    shown.to_string()
}
