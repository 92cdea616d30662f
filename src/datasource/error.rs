//! Datasource error types.

use thiserror::Error;

use crate::datasource::DatasourceType;
use crate::net::TransportError;

/// Errors raised while constructing the datasource at startup.
///
/// None of these are retriable: each one points at configuration the
/// operator has to fix.
#[derive(Debug, Error)]
pub enum DatasourceError {
    #[error("datasource.url is empty")]
    EmptyUrl,

    #[error("datasource.url {url:?} is invalid: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("datasource.url scheme {0:?} is not supported, expected http or https")]
    UnsupportedScheme(String),

    #[error("failed to create transport: {0}")]
    Transport(#[from] TransportError),
}

/// Errors raised while executing a query.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("error getting response from {url}: {source}")]
    Send {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("datasource returns unexpected response code {status} for {url}. Response body: {body}")]
    UnexpectedStatus { status: u16, url: String, body: String },

    #[error("error parsing datasource response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response error, query: {query}, errorType: {error_type}, error: {error}")]
    Api {
        query: String,
        error_type: String,
        error: String,
    },

    #[error("unknown status: {0}, expected success or error")]
    UnknownStatus(String),

    #[error("unknown result type: {got}, expected {expected}")]
    UnexpectedResultType { expected: &'static str, got: String },

    #[error("cannot parse sample value {0:?}")]
    InvalidValue(String),

    #[error("range queries are not supported for {0} datasource")]
    UnsupportedRange(DatasourceType),
}
