//! Error types for the MIHF client.
//!
//! Two families live here. [`ApiError`] is the closed taxonomy every network
//! call is classified into; its `Display` output is the short message shown to
//! the user, so presentation code matches on the variant or simply prints it.
//! [`MihfError`] covers everything local: storage, configuration, and the
//! session worker channel. [`PasswordChangeError`] is the one call-site specific
//! re-wrapping of `ApiError`.

use thiserror::Error;

/// Classified outcome of a failed request against the federation backend.
///
/// Produced exclusively by the API gateway. Variants are ordered by the
/// precedence the gateway applies when classifying a response.
///
/// # Examples
///
/// ```
/// use mihf::domain::ApiError;
///
/// let err = ApiError::ServerStatus(502);
/// assert_eq!(err.to_string(), "Server error (code: 502)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The backend rejected the credentials or the request (HTTP 400, 401, 403).
    #[error("Wrong phone or password")]
    InvalidCredentials,

    /// Any other non-2xx HTTP status.
    #[error("Server error (code: {0})")]
    ServerStatus(u16),

    /// A 2xx response whose body did not match the expected shape.
    #[error("Could not process the server response")]
    DecodingFailure,

    /// Timeout, unreachable host, dropped or refused connection.
    #[error("No internet connection")]
    NoConnection,

    /// Transport failure that is not a connectivity problem.
    #[error("{0}")]
    NetworkError(String),

    /// Anything that could not be classified.
    #[error("Unknown error")]
    Unknown,
}

/// The main error type for local MIHF client operations.
///
/// Network failures travel as [`ApiError`] and are wrapped here only when a
/// local operation (such as building the client) needs a single error type.
#[derive(Debug, Error)]
pub enum MihfError {
    /// Reading from or writing to a local store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Filesystem or I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialisation of a persisted value failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The TOML configuration file could not be parsed.
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The session worker is gone or dropped a reply.
    #[error("Session worker error: {0}")]
    Worker(String),

    /// Input rejected before any request was sent.
    #[error("{0}")]
    Validation(String),

    /// A request failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Failure of the change-password flow.
///
/// The backend answers a wrong old password with the same status it uses for
/// bad credentials, so in this context `InvalidCredentials` means exactly that.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordChangeError {
    /// The backend rejected the current password (HTTP 400/401/403).
    #[error("The current password is wrong")]
    WrongOldPassword,

    /// The request never reached the backend.
    #[error("No internet connection")]
    NoConnection,

    /// Unexpected HTTP status from the backend.
    #[error("Server error (code: {0})")]
    Server(u16),

    /// The form was rejected locally; nothing was sent.
    #[error("{0}")]
    Validation(String),

    /// No token was available when the change was submitted.
    #[error("Session expired")]
    SessionExpired,

    /// Any other gateway failure, passed through unchanged.
    #[error(transparent)]
    Api(ApiError),
}

impl From<ApiError> for PasswordChangeError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::InvalidCredentials => Self::WrongOldPassword,
            ApiError::NoConnection => Self::NoConnection,
            ApiError::ServerStatus(code) => Self::Server(code),
            other => Self::Api(other),
        }
    }
}

/// A specialized `Result` type for local MIHF operations.
pub type Result<T> = std::result::Result<T, MihfError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::credentials(ApiError::InvalidCredentials, PasswordChangeError::WrongOldPassword)]
    #[case::offline(ApiError::NoConnection, PasswordChangeError::NoConnection)]
    #[case::status(ApiError::ServerStatus(500), PasswordChangeError::Server(500))]
    #[case::decoding(
        ApiError::DecodingFailure,
        PasswordChangeError::Api(ApiError::DecodingFailure)
    )]
    fn password_change_wraps_api_errors(
        #[case] input: ApiError,
        #[case] expected: PasswordChangeError,
    ) {
        assert_eq!(PasswordChangeError::from(input), expected);
    }

    #[test]
    fn network_error_displays_its_detail() {
        let err = ApiError::NetworkError("tls handshake failed".into());
        assert_eq!(err.to_string(), "tls handshake failed");
    }
}
