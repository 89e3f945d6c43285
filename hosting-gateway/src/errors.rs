//! Crate-wide error hierarchy for hosting-gateway.

use thiserror::Error;

/// Convenient alias for gateway results.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Failure of a single call against the hosting API.
///
/// Variants carrying a `String` hold the provider's own message (GitLab
/// answers most client errors with `{"message": ...}`), so the text that
/// ends up in a webhook response explains what the hosting service refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Unauthorized (HTTP 401).
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden (HTTP 403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Not found (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Method not allowed (HTTP 405). GitLab uses it for merge requests
    /// that cannot be merged in their current state.
    #[error("not allowed: {0}")]
    NotAllowed(String),

    /// Conflict (HTTP 409), e.g. SHA mismatch on merge.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Unprocessable (HTTP 400/422), e.g. the tag already exists.
    #[error("rejected: {0}")]
    Rejected(String),

    /// Rate limited (HTTP 429).
    #[error("rate limited")]
    RateLimited {
        /// Optional `Retry-After` hint in seconds when available.
        retry_after_secs: Option<u64>,
    },

    /// Gateway / server error (HTTP 5xx).
    #[error("server error: status {0}")]
    Server(u16),

    /// Other HTTP status (non-2xx) not covered by specific variants.
    #[error("http status error: status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// Timeout at transport level.
    #[error("timeout")]
    Timeout,

    /// Network/transport failure without HTTP status (DNS/connect/reset).
    #[error("network error: {0}")]
    Network(String),

    /// Unexpected/invalid shape of provider response.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    /// Client could not be built from the given configuration.
    #[error("invalid gateway configuration: {0}")]
    Config(String),
}

impl GatewayError {
    /// Maps a non-success HTTP status and the provider message to a variant.
    pub fn from_status(status: u16, retry_after_secs: Option<u64>, message: String) -> Self {
        match status {
            401 => GatewayError::Unauthorized,
            403 => GatewayError::Forbidden(message),
            404 => GatewayError::NotFound(message),
            405 => GatewayError::NotAllowed(message),
            409 => GatewayError::Conflict(message),
            400 | 422 => GatewayError::Rejected(message),
            429 => GatewayError::RateLimited { retry_after_secs },
            500..=599 => GatewayError::Server(status),
            _ => GatewayError::HttpStatus { status, message },
        }
    }
}

// ===== Mapping from reqwest::Error =====

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return GatewayError::Timeout;
        }

        if let Some(status) = e.status() {
            return GatewayError::from_status(status.as_u16(), None, e.to_string());
        }

        if e.is_decode() {
            return GatewayError::InvalidResponse(e.to_string());
        }

        if e.is_builder() {
            return GatewayError::Config(e.to_string());
        }

        GatewayError::Network(e.to_string())
    }
}
