//! Error types for the authorization server.
//!
//! [`OAuthError`] is the wire-level taxonomy from RFC 6749 §4.1.2.1 and §5.2.
//! The other enums describe failures of individual components and convert
//! into it at the endpoint boundary.

use std::time::Duration;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

/// OAuth 2.0 protocol errors returned to clients.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OAuthError {
    /// Malformed request or missing parameter.
    #[error("invalid_request: {0}")]
    InvalidRequest(String),

    /// Client authentication failed or client unknown.
    #[error("invalid_client: {0}")]
    InvalidClient(String),

    /// Code or refresh token unknown, used, expired, or bound elsewhere.
    #[error("invalid_grant: {0}")]
    InvalidGrant(String),

    /// `grant_type` is not supported.
    #[error("unsupported_grant_type: {0}")]
    UnsupportedGrantType(String),

    /// `response_type` is not supported.
    #[error("unsupported_response_type: {0}")]
    UnsupportedResponseType(String),

    /// Requested scope exceeds what the client or grant allows.
    #[error("invalid_scope: {0}")]
    InvalidScope(String),

    /// The resource owner is not authenticated or denied the request.
    #[error("access_denied: {0}")]
    AccessDenied(String),

    /// Storage or random-source failure.
    #[error("server_error: {0}")]
    ServerError(String),
}

impl OAuthError {
    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an invalid grant error.
    #[must_use]
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant(message.into())
    }

    /// Client authentication failure. The description never says whether the
    /// id or the secret was wrong.
    #[must_use]
    pub fn invalid_client() -> Self {
        Self::InvalidClient("client authentication failed".to_string())
    }

    /// Returns the RFC 6749 error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidClient(_) => "invalid_client",
            Self::InvalidGrant(_) => "invalid_grant",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::UnsupportedResponseType(_) => "unsupported_response_type",
            Self::InvalidScope(_) => "invalid_scope",
            Self::AccessDenied(_) => "access_denied",
            Self::ServerError(_) => "server_error",
        }
    }

    /// Returns the HTTP status code for a direct (non-redirect) error response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidClient(_) => StatusCode::UNAUTHORIZED,
            Self::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Human-readable description suitable for `error_description`.
    ///
    /// Server errors are reported generically; their detail is only logged.
    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Self::ServerError(_) => "the server encountered an unexpected condition",
            Self::InvalidRequest(msg)
            | Self::InvalidClient(msg)
            | Self::InvalidGrant(msg)
            | Self::UnsupportedGrantType(msg)
            | Self::UnsupportedResponseType(msg)
            | Self::InvalidScope(msg)
            | Self::AccessDenied(msg) => msg,
        }
    }

    /// Returns true for the only class of error where retrying the same
    /// request can succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ServerError(_))
    }

    /// Build the JSON error body.
    #[must_use]
    pub fn to_response_body(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.error_code().to_string(),
            error_description: Some(self.description().to_string()),
        }
    }
}

/// OAuth 2.0 error response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Error code.
    pub error: String,

    /// Human-readable error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

/// Errors from client registration.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A client with this id is already registered.
    #[error("client already registered: {0}")]
    DuplicateClient(String),

    /// The client record is incomplete or malformed.
    #[error("invalid client: {0}")]
    InvalidClient(String),
}

/// Errors from a credential store backend.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A freshly generated key collided with a live entry.
    #[error("key already present in {namespace} store")]
    DuplicateKey {
        /// Namespace that rejected the insert
        namespace: &'static str,
    },

    /// The operation did not complete within the configured bound.
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    /// Backend-specific failure.
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Errors from access token validation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// No such access token (never issued, revoked, or already purged).
    #[error("token not found")]
    TokenNotFound,

    /// The token existed but has expired; it has now been deleted.
    #[error("token expired")]
    TokenExpired,

    /// Store failure while looking the token up.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The operating system random source failed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("random source failure: {0}")]
pub struct EntropyError(pub String);

impl From<StoreError> for OAuthError {
    fn from(err: StoreError) -> Self {
        Self::ServerError(err.to_string())
    }
}

impl From<EntropyError> for OAuthError {
    fn from(err: EntropyError) -> Self {
        Self::ServerError(err.to_string())
    }
}

impl From<TokenError> for OAuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::TokenNotFound | TokenError::TokenExpired => {
                Self::InvalidGrant(err.to_string())
            }
            TokenError::Store(store) => store.into(),
        }
    }
}

/// Result type alias for protocol operations.
pub type OAuthResult<T> = Result<T, OAuthError>;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
