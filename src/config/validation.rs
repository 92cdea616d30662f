//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the datasource URL is present, absolute and http(s)
//! - Check client TLS material is configured as a cert/key pair
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Config → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{Config, DatasourceConfig};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("datasource.url is empty")]
    EmptyUrl,

    #[error("datasource.url {url:?} is not a valid URL: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("datasource.url scheme {0:?} is not supported, expected http or https")]
    UnsupportedScheme(String),

    #[error("datasource.tls_cert_file is set without datasource.tls_key_file")]
    CertWithoutKey,

    #[error("datasource.tls_key_file is set without datasource.tls_cert_file")]
    KeyWithoutCert,

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a whole configuration.
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = validate_datasource(&config.datasource);

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Collect every problem with the datasource section.
pub fn validate_datasource(config: &DatasourceConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.url.is_empty() {
        errors.push(ValidationError::EmptyUrl);
    } else {
        match Url::parse(&config.url) {
            Ok(url) if url.scheme() != "http" && url.scheme() != "https" => {
                errors.push(ValidationError::UnsupportedScheme(url.scheme().to_string()));
            }
            Ok(_) => {}
            Err(e) => errors.push(ValidationError::InvalidUrl {
                url: config.url.clone(),
                reason: e.to_string(),
            }),
        }
    }

    match (is_set(&config.tls_cert_file), is_set(&config.tls_key_file)) {
        (true, false) => errors.push(ValidationError::CertWithoutKey),
        (false, true) => errors.push(ValidationError::KeyWithoutCert),
        _ => {}
    }

    errors
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}
