//! API gateway: the single network boundary of the client.
//!
//! Every request goes through [`ApiGateway::request`] (or
//! [`ApiGateway::request_empty`] for endpoints that answer without a body).
//! The gateway resolves the URL, attaches the bearer token, and classifies the
//! outcome into exactly one [`ApiError`] variant. Precedence:
//!
//! 1. connectivity failures (timeout, unreachable host, dropped link) → `NoConnection`
//! 2. other transport failures → `NetworkError(detail)`
//! 3. 2xx → decode the body, `DecodingFailure` if it does not fit
//! 4. 401 / 403 → forced-logout signal, then `InvalidCredentials`
//! 5. 400 → `InvalidCredentials`
//! 6. any other status → `ServerStatus(code)`
//! 7. anything else → `Unknown`
//!
//! The gateway never retries.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::Instrument;
use url::Url;

use super::transport::{Method, RawRequest, RawResponse, Transport, TransportError};
use crate::domain::ApiError;
use crate::session::AuthSignal;

/// Request description before it is resolved against the base URL.
///
/// # Examples
///
/// ```
/// use mihf::api::ApiRequest;
///
/// let request = ApiRequest::get("/players")
///     .query("page", 1)
///     .query("limit", 20)
///     .bearer("abc");
/// assert_eq!(request.path(), "/players");
/// ```
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    bearer: Option<String>,
}

impl std::fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("has_bearer", &self.bearer.is_some())
            .finish_non_exhaustive()
    }
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    /// `GET` request for `path` relative to the base URL.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// `POST` request; set the payload with [`json`](Self::json).
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// `PUT` request; set the payload with [`json`](Self::json).
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    /// `PATCH` request. A missing body is sent as no body at all.
    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    /// Adds a query parameter. Only sent for read methods.
    #[must_use]
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Adds a query parameter when `value` is present.
    #[must_use]
    pub fn query_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Sets the JSON body. Only sent for write methods.
    #[must_use]
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attaches `Authorization: Bearer <token>`.
    #[must_use]
    pub fn bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self
    }

    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Outcome of a raw exchange before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// 2xx with its body.
    Success(Vec<u8>),
    /// 401 or 403: the session must be torn down.
    Unauthorized,
    /// Any other failure, already classified.
    Failed(ApiError),
}

/// Maps a transport outcome to exactly one [`Classified`] value.
#[must_use]
pub fn classify(outcome: Result<RawResponse, TransportError>) -> Classified {
    match outcome {
        Err(TransportError::Connectivity(_)) => Classified::Failed(ApiError::NoConnection),
        Err(TransportError::Other(detail)) => Classified::Failed(ApiError::NetworkError(detail)),
        Ok(response) => match response.status {
            200..=299 => Classified::Success(response.body),
            401 | 403 => Classified::Unauthorized,
            400 => Classified::Failed(ApiError::InvalidCredentials),
            code @ 100..=599 => Classified::Failed(ApiError::ServerStatus(code)),
            _ => Classified::Failed(ApiError::Unknown),
        },
    }
}

/// Typed request executor shared by every screen.
///
/// Cheap to clone; clones share the transport and the forced-logout signal.
#[derive(Clone)]
pub struct ApiGateway {
    base_url: Url,
    transport: Arc<dyn Transport>,
    auth_signal: Option<AuthSignal>,
}

impl std::fmt::Debug for ApiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiGateway")
            .field("base_url", &self.base_url.as_str())
            .field("has_auth_signal", &self.auth_signal.is_some())
            .finish_non_exhaustive()
    }
}

impl ApiGateway {
    #[must_use]
    pub fn new(base_url: Url, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url,
            transport,
            auth_signal: None,
        }
    }

    /// Routes 401/403 rejections of authenticated requests to the session.
    #[must_use]
    pub fn with_auth_signal(mut self, signal: AuthSignal) -> Self {
        self.auth_signal = Some(signal);
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Executes `request` and decodes a 2xx body into `T`.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`]; see the module docs for precedence.
    pub async fn request<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let body = self.execute(request).await?;
        serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(error = %e, "response body did not decode");
            ApiError::DecodingFailure
        })
    }

    /// Executes `request` and ignores the body of a 2xx answer.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`] for any non-2xx outcome.
    pub async fn request_empty(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.execute(request).await.map(|_| ())
    }

    async fn execute(&self, request: ApiRequest) -> Result<Vec<u8>, ApiError> {
        let span = tracing::debug_span!(
            "api_request",
            method = request.method.as_str(),
            path = %request.path,
        );
        self.execute_in_span(request).instrument(span).await
    }

    async fn execute_in_span(&self, request: ApiRequest) -> Result<Vec<u8>, ApiError> {
        let raw = self.resolve(request)?;
        let rejected_token = raw.bearer.clone();

        let outcome = self.transport.send(raw).await;
        if let Ok(response) = &outcome {
            tracing::debug!(status = response.status, bytes = response.body.len(), "response received");
        }

        match classify(outcome) {
            Classified::Success(body) => Ok(body),
            Classified::Unauthorized => {
                tracing::warn!("request rejected as unauthorized");
                if let (Some(signal), Some(token)) = (&self.auth_signal, rejected_token) {
                    signal.force_logout(token);
                }
                Err(ApiError::InvalidCredentials)
            }
            Classified::Failed(err) => {
                tracing::debug!(error = %err, "request failed");
                Err(err)
            }
        }
    }

    fn resolve(&self, request: ApiRequest) -> Result<RawRequest, ApiError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                tracing::error!(base = %self.base_url, "base URL cannot carry a path");
                ApiError::Unknown
            })?;
            segments.pop_if_empty();
            segments.extend(request.path.split('/').filter(|s| !s.is_empty()));
        }

        let is_write = request.method.is_write();
        if !is_write && !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }

        Ok(RawRequest {
            method: request.method,
            url,
            bearer: request.bearer,
            body: if is_write { request.body } else { None },
        })
    }
}
