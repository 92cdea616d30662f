//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the datasource
//! client. All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    /// Datasource connection settings.
    pub datasource: DatasourceConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Settings for the VictoriaMetrics (or vmselect) datasource.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatasourceConfig {
    /// VictoriaMetrics or vmselect url (e.g., "http://127.0.0.1:8428"). Required.
    pub url: String,

    /// Add a type prefix to `url` based on the query type.
    /// Set when sending different query types to the vmselect URL.
    pub append_type_prefix: bool,

    /// Optional basic auth username.
    pub basic_auth_username: String,

    /// Optional basic auth password.
    pub basic_auth_password: String,

    /// Skip TLS verification when connecting to `url`.
    pub tls_insecure_skip_verify: bool,

    /// Optional path to the client-side TLS certificate (PEM).
    pub tls_cert_file: Option<String>,

    /// Optional path to the client-side TLS key (PEM).
    pub tls_key_file: Option<String>,

    /// Optional path to a CA bundle (PEM). Default roots are used when unset.
    pub tls_ca_file: Option<String>,

    /// Optional TLS server name. The host from `url` is used when unset.
    pub tls_server_name: Option<String>,

    /// How far into the past to look when evaluating queries, in seconds.
    /// With `lookback_secs = 300` every instant query gets `time=now()-5m`.
    pub lookback_secs: u64,

    /// Value of the `step` param added to every query, in seconds.
    /// The rule's evaluation interval is used when unset.
    pub query_step_secs: Option<u64>,

    /// Idle keep-alive connections per host.
    /// Consider `groups_total * group.concurrency`; too low a value leaves
    /// many sockets in TIME_WAIT.
    pub max_idle_connections: usize,
}

impl Default for DatasourceConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            append_type_prefix: false,
            basic_auth_username: String::new(),
            basic_auth_password: String::new(),
            tls_insecure_skip_verify: false,
            tls_cert_file: None,
            tls_key_file: None,
            tls_ca_file: None,
            tls_server_name: None,
            lookback_secs: 0,
            query_step_secs: None,
            max_idle_connections: default_max_idle_connections(),
        }
    }
}

impl DatasourceConfig {
    /// Config pointing at `url` with every other field defaulted.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Lookback as a duration; zero means disabled.
    pub fn lookback(&self) -> Duration {
        Duration::from_secs(self.lookback_secs)
    }

    /// Explicit query step, if configured.
    pub fn query_step(&self) -> Option<Duration> {
        self.query_step_secs.map(Duration::from_secs)
    }
}

fn default_max_idle_connections() -> usize {
    100
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
