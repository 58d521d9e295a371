//! HTTP transport seam.
//!
//! The gateway only needs "send this request, give me status and body". Keeping
//! that behind [`Transport`] lets tests script the backend without a socket
//! and keeps reqwest specifics (timeouts, TLS, error inspection) in one place.

use std::error::Error as _;
use std::io::ErrorKind;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

/// HTTP verbs used by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
}

impl Method {
    /// Write methods carry a JSON body; reads carry query parameters.
    #[must_use]
    pub const fn is_write(self) -> bool {
        !matches!(self, Self::Get)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
        }
    }
}

/// Fully resolved request handed to a [`Transport`].
#[derive(Clone, PartialEq)]
pub struct RawRequest {
    pub method: Method,
    pub url: Url,
    pub bearer: Option<String>,
    pub body: Option<serde_json::Value>,
}

impl std::fmt::Debug for RawRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("has_bearer", &self.bearer.is_some())
            .field("body", &self.body)
            .finish()
    }
}

/// Status and body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Failure before an HTTP status was received.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Timeout, unreachable host, refused or dropped connection.
    #[error("connectivity failure: {0}")]
    Connectivity(String),

    /// Anything else: TLS, malformed response, redirect loops.
    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs one exchange. Non-2xx statuses are responses, not errors.
    async fn send(&self, request: RawRequest) -> Result<RawResponse, TransportError>;
}

/// Production transport backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Builds a client with an overall per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mihf/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: RawRequest) -> Result<RawResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
        };

        let mut builder = self
            .client
            .request(method, request.url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = request.bearer.as_deref() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = request.body.as_ref() {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_transport_error)?;
        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn map_transport_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() || error.is_connect() || has_connectivity_cause(&error) {
        TransportError::Connectivity(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}

/// Walks the source chain looking for an I/O error that means the link dropped.
fn has_connectivity_cause(error: &reqwest::Error) -> bool {
    let mut source = error.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if is_connectivity_kind(io.kind()) {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

const fn is_connectivity_kind(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::BrokenPipe
            | ErrorKind::TimedOut
            | ErrorKind::UnexpectedEof
    )
}
