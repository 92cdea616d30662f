//! Pooled HTTP transport for datasource connections.
//!
//! # Responsibilities
//! - Configure keep-alive connection reuse
//! - Attach client TLS settings for https endpoints
//! - Expose the idle-connection-per-host cap to the datasource factory

use std::time::Duration;

use url::Url;

use crate::net::tls::{load_client_config, TlsOptions};
use crate::net::TransportError;

/// Idle keep-alive connections kept per host when the caller sets no cap.
pub const DEFAULT_MAX_IDLE_PER_HOST: usize = 100;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const TCP_KEEPALIVE: Duration = Duration::from_secs(30);
const IDLE_CONNECTION_TIMEOUT: Duration = Duration::from_secs(90);

/// A configured, not yet started HTTP transport.
///
/// Nothing is dialed until the resulting client issues its first request.
#[derive(Debug)]
pub struct Transport {
    builder: reqwest::ClientBuilder,
    tls_enabled: bool,
    max_idle_per_host: usize,
}

impl Transport {
    /// Cap the number of idle pooled connections kept per host.
    pub fn set_max_idle_per_host(&mut self, max_idle: usize) {
        self.max_idle_per_host = max_idle;
    }

    /// Current idle-connection-per-host cap.
    pub fn max_idle_per_host(&self) -> usize {
        self.max_idle_per_host
    }

    /// Whether a client TLS configuration is attached.
    pub fn tls_enabled(&self) -> bool {
        self.tls_enabled
    }

    /// Finish the transport into a pooled client.
    pub fn into_client(self) -> Result<reqwest::Client, TransportError> {
        let client = self
            .builder
            .pool_max_idle_per_host(self.max_idle_per_host)
            .build()?;
        Ok(client)
    }
}

/// Build a transport for `endpoint`.
///
/// TLS material is loaded when the endpoint is `https` or when any
/// certificate file is supplied, so that broken files are reported at
/// startup even for plain-text endpoints.
pub fn build_transport(endpoint: &Url, tls: &TlsOptions) -> Result<Transport, TransportError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("vmquery/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(CONNECT_TIMEOUT)
        .tcp_keepalive(TCP_KEEPALIVE)
        .pool_idle_timeout(IDLE_CONNECTION_TIMEOUT);

    let tls_enabled = endpoint.scheme() == "https" || tls.has_material();
    if tls_enabled {
        let config = load_client_config(tls)?;
        builder = builder.use_preconfigured_tls(config);
    }

    tracing::debug!(
        endpoint = %endpoint.host_str().unwrap_or_default(),
        tls = tls_enabled,
        insecure_skip_verify = tls.insecure_skip_verify,
        "Transport configured"
    );

    Ok(Transport {
        builder,
        tls_enabled,
        max_idle_per_host: DEFAULT_MAX_IDLE_PER_HOST,
    })
}
