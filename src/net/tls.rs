//! Client-side TLS configuration and certificate loading.
//!
//! Builds the rustls `ClientConfig` handed to the HTTP client:
//! - client certificate for mutual TLS (cert + key PEM files)
//! - trust roots from a CA bundle, or the bundled webpki roots
//! - optional server-name override for certificate verification
//! - optional `insecure_skip_verify`

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};

use crate::net::TransportError;

/// TLS settings for connections to the datasource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsOptions {
    /// Client certificate (PEM) presented for mutual TLS.
    pub cert_file: Option<String>,
    /// Private key (PEM) matching `cert_file`.
    pub key_file: Option<String>,
    /// CA bundle (PEM) used instead of the default roots.
    pub ca_file: Option<String>,
    /// Name to verify the server certificate against instead of the URL host.
    pub server_name: Option<String>,
    /// Accept any server certificate.
    pub insecure_skip_verify: bool,
}

impl TlsOptions {
    /// Whether any certificate or key file was supplied.
    pub fn has_material(&self) -> bool {
        set(&self.cert_file).is_some() || set(&self.key_file).is_some() || set(&self.ca_file).is_some()
    }
}

fn set(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Build a rustls client config from the given options.
pub fn load_client_config(opts: &TlsOptions) -> Result<ClientConfig, TransportError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let verifier: Arc<dyn ServerCertVerifier> = if opts.insecure_skip_verify {
        Arc::new(InsecureCertVerifier::new(provider.clone()))
    } else {
        let roots = match set(&opts.ca_file) {
            Some(path) => load_ca_roots(path)?,
            None => default_roots(),
        };
        let webpki = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider.clone()).build()?;

        match set(&opts.server_name) {
            Some(name) => Arc::new(ServerNameOverrideVerifier::new(webpki, name)?),
            None => webpki,
        }
    };

    let builder = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(verifier);

    let config = match (set(&opts.cert_file), set(&opts.key_file)) {
        (Some(cert_path), Some(key_path)) => {
            let certs = load_certs(cert_path, "cert_file")?;
            let key = load_private_key(key_path)?;
            builder.with_client_auth_cert(certs, key).map_err(|source| {
                TransportError::ClientCertificate {
                    cert_path: cert_path.to_string(),
                    key_path: key_path.to_string(),
                    source,
                }
            })?
        }
        (None, None) => builder.with_no_client_auth(),
        _ => return Err(TransportError::IncompleteClientCertificate),
    };

    Ok(config)
}

fn default_roots() -> RootCertStore {
    RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    }
}

fn open(path: &str, kind: &'static str) -> Result<BufReader<File>, TransportError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| TransportError::ReadFile {
            kind,
            path: path.to_string(),
            source,
        })
}

fn load_certs(path: &str, kind: &'static str) -> Result<Vec<CertificateDer<'static>>, TransportError> {
    let certs = rustls_pemfile::certs(&mut open(path, kind)?)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TransportError::ReadFile {
            kind,
            path: path.to_string(),
            source,
        })?;

    if certs.is_empty() {
        return Err(TransportError::NoCertificates {
            kind,
            path: path.to_string(),
        });
    }
    Ok(certs)
}

fn load_private_key(path: &str) -> Result<PrivateKeyDer<'static>, TransportError> {
    rustls_pemfile::private_key(&mut open(path, "key_file")?)
        .map_err(|source| TransportError::ReadFile {
            kind: "key_file",
            path: path.to_string(),
            source,
        })?
        .ok_or_else(|| TransportError::NoPrivateKey {
            path: path.to_string(),
        })
}

fn load_ca_roots(path: &str) -> Result<RootCertStore, TransportError> {
    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(load_certs(path, "ca_file")?);
    if added == 0 {
        return Err(TransportError::NoCertificates {
            kind: "ca_file",
            path: path.to_string(),
        });
    }
    if ignored > 0 {
        tracing::warn!(path = %path, ignored, "Skipped unparsable certificates in CA file");
    }
    Ok(roots)
}

/// Verifies the server certificate against a fixed name instead of the
/// host the connection was made to.
#[derive(Debug)]
struct ServerNameOverrideVerifier {
    inner: Arc<WebPkiServerVerifier>,
    server_name: ServerName<'static>,
}

impl ServerNameOverrideVerifier {
    fn new(inner: Arc<WebPkiServerVerifier>, name: &str) -> Result<Self, TransportError> {
        let server_name = ServerName::try_from(name)
            .map_err(|_| TransportError::InvalidServerName(name.to_string()))?
            .to_owned();
        Ok(Self { inner, server_name })
    }
}

impl ServerCertVerifier for ServerNameOverrideVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        self.inner
            .verify_server_cert(end_entity, intermediates, &self.server_name, ocsp_response, now)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// Accepts any server certificate. Handshake signatures are still checked.
#[derive(Debug)]
struct InsecureCertVerifier {
    provider: Arc<CryptoProvider>,
}

impl InsecureCertVerifier {
    fn new(provider: Arc<CryptoProvider>) -> Self {
        Self { provider }
    }
}

impl ServerCertVerifier for InsecureCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}
