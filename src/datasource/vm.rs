//! VictoriaMetrics / vmselect querier.

use std::fmt;
use std::time::{Duration, Instant, SystemTime};

use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

use crate::datasource::request::QueryPolicy;
use crate::datasource::response::{parse_graphite, parse_instant, parse_range};
use crate::datasource::{DatasourceType, Metric, Querier, QuerierBuilder, QuerierParams, QueryError};
use crate::observability::metrics;

/// Basic auth credentials attached to every request.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    /// `None` when both parts are empty.
    pub fn from_parts(username: &str, password: &str) -> Option<Self> {
        if username.is_empty() && password.is_empty() {
            return None;
        }
        Some(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Querier and querier builder for VictoriaMetrics-compatible APIs.
///
/// Cloning is cheap: clones share the pooled client.
#[derive(Debug, Clone)]
pub struct VmStorage {
    client: reqwest::Client,
    auth: Option<BasicAuth>,
    policy: QueryPolicy,
}

impl VmStorage {
    pub fn new(
        url: Url,
        auth: Option<BasicAuth>,
        lookback: Duration,
        query_step: Option<Duration>,
        append_type_prefix: bool,
        client: reqwest::Client,
    ) -> Self {
        Self {
            client,
            auth,
            policy: QueryPolicy {
                base: url,
                append_type_prefix,
                lookback,
                query_step,
                params: QuerierParams::default(),
            },
        }
    }

    /// Copy bound to `params`, sharing the connection pool.
    pub fn with_params(&self, params: QuerierParams) -> Self {
        let mut storage = self.clone();
        storage.policy.params = params;
        storage
    }

    pub fn endpoint(&self) -> &Url {
        &self.policy.base
    }

    pub fn basic_auth(&self) -> Option<&BasicAuth> {
        self.auth.as_ref()
    }

    pub fn append_type_prefix(&self) -> bool {
        self.policy.append_type_prefix
    }

    pub fn lookback(&self) -> Duration {
        self.policy.lookback
    }

    pub fn query_step(&self) -> Option<Duration> {
        self.policy.query_step
    }

    pub fn params(&self) -> QuerierParams {
        self.policy.params
    }

    pub fn policy(&self) -> &QueryPolicy {
        &self.policy
    }

    async fn execute<F>(&self, kind: &'static str, url: Url, decode: F) -> Result<Vec<Metric>, QueryError>
    where
        F: FnOnce(&[u8]) -> Result<Vec<Metric>, QueryError>,
    {
        let start = Instant::now();
        let datasource_type = self.policy.params.datasource_type;
        let result = self.send(url, decode).await;

        metrics::record_query(datasource_type.as_str(), kind, result.is_ok(), start);
        if let Err(e) = &result {
            tracing::debug!(
                datasource_type = %datasource_type,
                kind,
                error = %e,
                "Datasource query failed"
            );
        }
        result
    }

    async fn send<F>(&self, url: Url, decode: F) -> Result<Vec<Metric>, QueryError>
    where
        F: FnOnce(&[u8]) -> Result<Vec<Metric>, QueryError>,
    {
        let display_url = redact(&url);
        tracing::trace!(url = %display_url, "Sending datasource request");

        let mut request = self.client.get(url);
        if let Some(auth) = &self.auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = request.send().await.map_err(|source| QueryError::Send {
            url: display_url.clone(),
            source,
        })?;
        let status = response.status();
        let body = response.bytes().await.map_err(|source| QueryError::Send {
            url: display_url.clone(),
            source,
        })?;

        if status != StatusCode::OK {
            return Err(QueryError::UnexpectedStatus {
                status: status.as_u16(),
                url: display_url,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        decode(&body)
    }
}

/// URL without credentials, for logs and errors.
pub(crate) fn redact(url: &Url) -> String {
    let mut url = url.clone();
    // Only fails for cannot-be-a-base URLs, which carry no credentials.
    let _ = url.set_username("");
    let _ = url.set_password(None);
    url.to_string()
}

impl QuerierBuilder for VmStorage {
    fn build_with_params(&self, params: QuerierParams) -> Box<dyn Querier> {
        Box::new(self.with_params(params))
    }
}

#[async_trait]
impl Querier for VmStorage {
    async fn query(&self, query: &str, timestamp: SystemTime) -> Result<Vec<Metric>, QueryError> {
        match self.policy.params.datasource_type {
            DatasourceType::Prometheus => {
                let url = self.policy.prometheus_instant_url(query, timestamp);
                self.execute("instant", url, |body| parse_instant(query, body)).await
            }
            DatasourceType::Graphite => {
                let url = self.policy.graphite_url(query, timestamp);
                self.execute("instant", url, parse_graphite).await
            }
        }
    }

    async fn query_range(
        &self,
        query: &str,
        start: SystemTime,
        end: SystemTime,
    ) -> Result<Vec<Metric>, QueryError> {
        match self.policy.params.datasource_type {
            DatasourceType::Prometheus => {
                let url = self.policy.prometheus_range_url(query, start, end);
                self.execute("range", url, |body| parse_range(query, body)).await
            }
            other => Err(QueryError::UnsupportedRange(other)),
        }
    }
}
