//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rustls::pki_types::PrivateKeyDer;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

pub const PROM_VECTOR: &str = r#"{"status":"success","data":{"resultType":"vector","result":[{"metric":{"__name__":"up","job":"vmagent"},"value":[1583786142,"1"]}]}}"#;

pub const PROM_MATRIX: &str = r#"{"status":"success","data":{"resultType":"matrix","result":[{"metric":{"__name__":"up"},"values":[[1000,"1"],[1060,"0"]]}]}}"#;

pub const GRAPHITE_SERIES: &str = r#"[{"target":"constantLine(10)","tags":{"name":"10"},"datapoints":[[10,1611758343],[10,1611758403]]}]"#;

/// A request as seen by the mock backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn path(&self) -> String {
        self.url().path().to_string()
    }

    pub fn param(&self, name: &str) -> Option<String> {
        self.url()
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn url(&self) -> url::Url {
        url::Url::parse(&format!("http://mock{}", self.target)).unwrap()
    }
}

#[derive(Default)]
struct Recorded {
    requests: Vec<RecordedRequest>,
    connections: usize,
}

/// Keep-alive HTTP/1.1 backend that records every request it serves.
#[derive(Clone)]
pub struct MockBackend {
    pub addr: SocketAddr,
    scheme: &'static str,
    recorded: Arc<Mutex<Recorded>>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("{}://{}", self.scheme, self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.recorded.lock().unwrap().requests.clone()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests().pop().expect("no request recorded")
    }

    /// Number of TCP connections accepted so far.
    pub fn connections(&self) -> usize {
        self.recorded.lock().unwrap().connections
    }
}

type Handler = dyn Fn(&RecordedRequest) -> (u16, String) + Send + Sync;

/// Start a mock backend that always answers 200 with `body`.
pub async fn start_mock_backend(body: &'static str) -> MockBackend {
    start_programmable_backend(move |_| (200, body.to_string())).await
}

/// Start a mock backend whose responses are computed per request.
pub async fn start_programmable_backend<F>(f: F) -> MockBackend
where
    F: Fn(&RecordedRequest) -> (u16, String) + Send + Sync + 'static,
{
    spawn_backend(Arc::new(f), Duration::ZERO, None).await
}

/// Start a mock backend that holds every response for `delay`.
pub async fn start_slow_backend(body: &'static str, delay: Duration) -> MockBackend {
    spawn_backend(Arc::new(move |_: &RecordedRequest| (200, body.to_string())), delay, None).await
}

/// Start an https mock backend terminating TLS with `config`.
pub async fn start_tls_backend(body: &'static str, config: rustls::ServerConfig) -> MockBackend {
    let acceptor = TlsAcceptor::from(Arc::new(config));
    spawn_backend(
        Arc::new(move |_: &RecordedRequest| (200, body.to_string())),
        Duration::ZERO,
        Some(acceptor),
    )
    .await
}

/// Self-signed certificate for `names` and a server config presenting it.
///
/// Returns the certificate PEM so clients can trust it as a CA file.
pub fn self_signed_server(names: &[&str]) -> (String, rustls::ServerConfig) {
    let names = names.iter().map(|n| n.to_string()).collect::<Vec<_>>();
    let certified = rcgen::generate_simple_self_signed(names).unwrap();
    let cert_pem = certified.cert.pem();
    let key = PrivateKeyDer::Pkcs8(certified.key_pair.serialize_der().into());

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(vec![certified.cert.der().clone()], key)
        .unwrap();
    (cert_pem, config)
}

async fn spawn_backend(f: Arc<Handler>, delay: Duration, tls: Option<TlsAcceptor>) -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = MockBackend {
        addr: listener.local_addr().unwrap(),
        scheme: if tls.is_some() { "https" } else { "http" },
        recorded: Arc::new(Mutex::new(Recorded::default())),
    };
    let recorded = backend.recorded.clone();

    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            recorded.lock().unwrap().connections += 1;
            let f = f.clone();
            let recorded = recorded.clone();
            let tls = tls.clone();

            tokio::spawn(async move {
                match tls {
                    Some(acceptor) => {
                        // Handshake failures are what the TLS tests look for on the client side.
                        if let Ok(stream) = acceptor.accept(socket).await {
                            serve_connection(stream, f, recorded, delay).await;
                        }
                    }
                    None => serve_connection(socket, f, recorded, delay).await,
                }
            });
        }
    });

    backend
}

async fn serve_connection<S>(mut socket: S, f: Arc<Handler>, recorded: Arc<Mutex<Recorded>>, delay: Duration)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        // GET requests carry no body, so a request ends at the blank line.
        let end = loop {
            if let Some(pos) = find_header_end(&buf) {
                break pos;
            }
            match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        };
        let head = String::from_utf8_lossy(&buf[..end]).into_owned();
        buf.drain(..end + 4);

        let request = parse_request(&head);
        let (status, body) = f(&request);
        recorded.lock().unwrap().requests.push(request);

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            status_line(status),
            body.len(),
            body
        );
        if socket.write_all(response.as_bytes()).await.is_err() {
            return;
        }
        let _ = socket.flush().await;
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn parse_request(head: &str) -> RecordedRequest {
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split(' ');
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();
    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    RecordedRequest {
        method,
        target,
        headers,
    }
}

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        400 => "400 Bad Request",
        401 => "401 Unauthorized",
        404 => "404 Not Found",
        422 => "422 Unprocessable Entity",
        500 => "500 Internal Server Error",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}
