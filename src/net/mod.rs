//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Endpoint URL + TLS options
//!     → tls.rs (load cert/key/CA, pick certificate verifier)
//!     → transport.rs (keep-alive pool, idle cap, preconfigured TLS)
//!     → reqwest::Client owned by the datasource
//! ```
//!
//! # Design Decisions
//! - No network I/O at construction; connections open on first query
//! - TLS is optional and handled transparently
//! - The connection pool is the only shared mutable state and lives in reqwest

pub mod tls;
pub mod transport;

use thiserror::Error;

pub use tls::TlsOptions;
pub use transport::{build_transport, Transport, DEFAULT_MAX_IDLE_PER_HOST};

/// Errors raised while provisioning the transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A TLS file could not be opened or read.
    #[error("cannot read `{kind}` {path:?}: {source}")]
    ReadFile {
        kind: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A PEM file contained no certificates.
    #[error("cannot parse certificates from `{kind}` {path:?}")]
    NoCertificates { kind: &'static str, path: String },

    /// The key file contained no private key.
    #[error("no private key found in `key_file` {path:?}")]
    NoPrivateKey { path: String },

    /// Only one half of the client certificate pair was supplied.
    #[error("both `cert_file` and `key_file` must be set for client certificates")]
    IncompleteClientCertificate,

    /// The certificate/key pair was rejected.
    #[error("cannot load TLS certificate from `cert_file`={cert_path:?}, `key_file`={key_path:?}: {source}")]
    ClientCertificate {
        cert_path: String,
        key_path: String,
        #[source]
        source: rustls::Error,
    },

    /// The server-name override is not a valid DNS name or IP address.
    #[error("invalid TLS server name {0:?}")]
    InvalidServerName(String),

    /// rustls rejected the configuration.
    #[error("TLS configuration error: {0}")]
    Tls(#[from] rustls::Error),

    /// The certificate verifier could not be built.
    #[error("cannot build certificate verifier: {0}")]
    Verifier(#[from] rustls::client::VerifierBuilderError),

    /// reqwest failed to build the client.
    #[error("cannot build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
