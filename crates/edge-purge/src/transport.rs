//! Ban request wire format and transports.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use edge_cache::BanPattern;
use http::Method;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::error::TransportError;
use crate::registry::CacheServer;

/// One ban request: method, regex request target and optional Host header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanRequest {
    method: Method,
    pattern: String,
    host: Option<String>,
}

impl BanRequest {
    /// Create a request from its parts.
    pub fn new(method: Method, pattern: impl Into<String>, host: Option<String>) -> Self {
        Self {
            method,
            pattern: pattern.into(),
            host,
        }
    }

    /// Create a request for a composed ban pattern.
    pub fn for_pattern(method: Method, pattern: &BanPattern) -> Self {
        Self::new(method, pattern.as_str(), pattern.host().map(String::from))
    }

    /// The request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The regex sent as request target.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The host the ban applies to.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// HTTP/1.1 request bytes for `server`.
    ///
    /// The request target is the raw pattern; whitespace and control bytes
    /// are percent-encoded so the request line stays intact. Without a host
    /// the server address is sent as Host.
    pub fn encode(&self, server: &CacheServer) -> String {
        let host = match &self.host {
            Some(host) => host.clone(),
            None => server.address(),
        };

        format!(
            "{} {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            self.method,
            request_target(&self.pattern),
            host
        )
    }
}

fn request_target(pattern: &str) -> String {
    let mut target = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if c.is_ascii_whitespace() || c.is_ascii_control() {
            let _ = write!(target, "%{:02X}", c as u32);
        } else {
            target.push(c);
        }
    }
    target
}

/// Status returned by a cache server for a ban.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BanResponse {
    /// HTTP status code.
    pub status: u16,
}

/// Sends ban requests to a single cache server.
#[async_trait]
pub trait BanTransport: Send + Sync {
    /// Deliver `request` to `server`; a non-2xx answer is an error.
    async fn send(&self, server: &CacheServer, request: &BanRequest) -> Result<BanResponse, TransportError>;
}

#[async_trait]
impl<B: BanTransport + ?Sized> BanTransport for Arc<B> {
    async fn send(&self, server: &CacheServer, request: &BanRequest) -> Result<BanResponse, TransportError> {
        (**self).send(server, request).await
    }
}

/// Plain HTTP/1.1 over TCP, one connection per request.
#[derive(Debug, Clone)]
pub struct TcpBanTransport {
    timeout: Duration,
}

impl TcpBanTransport {
    /// Create a transport bounding each exchange by `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn exchange(&self, server: &CacheServer, request: &BanRequest) -> Result<BanResponse, TransportError> {
        let mut stream = TcpStream::connect((server.host.as_str(), server.port))
            .await
            .map_err(|source| TransportError::Connect {
                address: server.address(),
                source,
            })?;

        stream.write_all(request.encode(server).as_bytes()).await?;
        stream.flush().await?;

        let mut reader = BufReader::new(stream);
        let mut status_line = String::new();
        let read = reader.read_line(&mut status_line).await?;
        if read == 0 {
            return Err(TransportError::MalformedResponse(
                "connection closed before status line".to_string(),
            ));
        }

        let status = parse_status_line(&status_line)?;
        if !(200..300).contains(&status) {
            return Err(TransportError::Status(status));
        }

        Ok(BanResponse { status })
    }
}

impl Default for TcpBanTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

#[async_trait]
impl BanTransport for TcpBanTransport {
    async fn send(&self, server: &CacheServer, request: &BanRequest) -> Result<BanResponse, TransportError> {
        tokio::time::timeout(self.timeout, self.exchange(server, request))
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))?
    }
}

/// Status code of an `HTTP/1.x NNN reason` line.
pub(crate) fn parse_status_line(line: &str) -> Result<u16, TransportError> {
    let line = line.trim_end();
    let mut parts = line.splitn(3, ' ');

    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/") {
        return Err(TransportError::MalformedResponse(line.to_string()));
    }

    parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .filter(|code| (100..600).contains(code))
        .ok_or_else(|| TransportError::MalformedResponse(line.to_string()))
}
