//! Datasource construction from configuration.

use url::Url;

use crate::config::DatasourceConfig;
use crate::datasource::vm::redact;
use crate::datasource::{BasicAuth, DatasourceError, VmStorage};
use crate::net::{build_transport, TlsOptions};

impl From<&DatasourceConfig> for TlsOptions {
    fn from(config: &DatasourceConfig) -> Self {
        Self {
            cert_file: config.tls_cert_file.clone(),
            key_file: config.tls_key_file.clone(),
            ca_file: config.tls_ca_file.clone(),
            server_name: config.tls_server_name.clone(),
            insecure_skip_verify: config.tls_insecure_skip_verify,
        }
    }
}

/// Create the datasource querier builder from configuration.
///
/// Runs once at startup. Any error is fatal: the caller must not start
/// rule evaluation. No connections are opened here.
pub fn init(config: &DatasourceConfig) -> Result<VmStorage, DatasourceError> {
    if config.url.is_empty() {
        return Err(DatasourceError::EmptyUrl);
    }

    let endpoint = Url::parse(&config.url).map_err(|source| DatasourceError::InvalidUrl {
        url: config.url.clone(),
        source,
    })?;
    if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
        return Err(DatasourceError::UnsupportedScheme(endpoint.scheme().to_string()));
    }

    let tls = TlsOptions::from(config);
    let mut transport = build_transport(&endpoint, &tls)?;
    transport.set_max_idle_per_host(config.max_idle_connections);
    let tls_enabled = transport.tls_enabled();
    let client = transport.into_client()?;

    if tls_enabled && config.tls_insecure_skip_verify {
        tracing::warn!(url = %redact(&endpoint), "TLS certificate verification is disabled for the datasource");
    }

    let auth = BasicAuth::from_parts(&config.basic_auth_username, &config.basic_auth_password);

    tracing::info!(
        url = %redact(&endpoint),
        append_type_prefix = config.append_type_prefix,
        lookback = ?config.lookback(),
        query_step = ?config.query_step(),
        max_idle_connections = config.max_idle_connections,
        tls = tls_enabled,
        basic_auth = auth.is_some(),
        "Datasource initialized"
    );

    Ok(VmStorage::new(
        endpoint,
        auth,
        config.lookback(),
        config.query_step(),
        config.append_type_prefix,
        client,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::TransportError;
    use std::time::Duration;

    #[test]
    fn test_empty_url() {
        let err = init(&DatasourceConfig::default()).unwrap_err();
        assert!(matches!(err, DatasourceError::EmptyUrl));
        assert_eq!(err.to_string(), "datasource.url is empty");
    }

    #[test]
    fn test_invalid_url() {
        let err = init(&DatasourceConfig::with_url("127.0.0.1:8428")).unwrap_err();
        assert!(matches!(err, DatasourceError::InvalidUrl { .. }));
    }

    #[test]
    fn test_unsupported_scheme() {
        let err = init(&DatasourceConfig::with_url("unix:///var/run/vm.sock")).unwrap_err();
        assert!(matches!(err, DatasourceError::UnsupportedScheme(ref s) if s == "unix"));
    }

    #[test]
    fn test_binds_policy() {
        let mut config = DatasourceConfig::with_url("http://127.0.0.1:8428");
        config.basic_auth_username = "vmalert".into();
        config.basic_auth_password = "secret".into();
        config.lookback_secs = 300;
        config.query_step_secs = Some(15);

        let storage = init(&config).unwrap();
        assert_eq!(storage.endpoint().as_str(), "http://127.0.0.1:8428/");
        assert!(!storage.append_type_prefix());
        assert_eq!(storage.basic_auth().map(|a| a.username.as_str()), Some("vmalert"));
        assert_eq!(storage.lookback(), Duration::from_secs(300));
        assert_eq!(storage.query_step(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_empty_credentials_mean_no_auth() {
        let storage = init(&DatasourceConfig::with_url("http://127.0.0.1:8428")).unwrap();
        assert!(storage.basic_auth().is_none());
    }

    #[test]
    fn test_transport_failure_is_wrapped() {
        let mut config = DatasourceConfig::with_url("https://vmselect:8481");
        config.tls_cert_file = Some("/nonexistent/cert.pem".into());
        config.tls_key_file = Some("/nonexistent/key.pem".into());

        let err = init(&config).unwrap_err();
        assert!(matches!(
            err,
            DatasourceError::Transport(TransportError::ReadFile { kind: "cert_file", .. })
        ));
        assert!(err.to_string().starts_with("failed to create transport: "));
    }
}
