//! External service error types with retry classification.
//!
//! A failed query is always reported as an `ExternalServiceError`, never as an
//! empty result set, so verdict rules can tell "unreachable" from "no matches".

use std::time::Duration;

/// Error from mailbox or calendar queries.
#[derive(Debug, Clone)]
pub struct ExternalServiceError {
    /// The kind of error
    pub kind: ExternalErrorKind,
    /// HTTP status code, if applicable
    pub status_code: Option<u16>,
    /// Error message
    pub message: String,
    /// Suggested retry delay (from Retry-After header)
    pub retry_after: Option<Duration>,
}

impl ExternalServiceError {
    /// Create a rate limit error.
    pub fn rate_limited(message: String, retry_after: Option<Duration>) -> Self {
        Self {
            kind: ExternalErrorKind::RateLimited,
            status_code: Some(429),
            message,
            retry_after,
        }
    }

    /// Create a server error.
    pub fn server_error(status_code: u16, message: String) -> Self {
        Self {
            kind: ExternalErrorKind::ServerError,
            status_code: Some(status_code),
            message,
            retry_after: None,
        }
    }

    /// Create an authentication/authorization error (expired or missing scope).
    pub fn auth_error(status_code: u16, message: String) -> Self {
        Self {
            kind: ExternalErrorKind::AuthError,
            status_code: Some(status_code),
            message,
            retry_after: None,
        }
    }

    /// Create a client error (bad request, not found, ...).
    pub fn client_error(status_code: u16, message: String) -> Self {
        Self {
            kind: ExternalErrorKind::ClientError,
            status_code: Some(status_code),
            message,
            retry_after: None,
        }
    }

    /// A query that could not be built, so nothing was sent.
    pub fn invalid_query(message: String) -> Self {
        Self {
            kind: ExternalErrorKind::ClientError,
            status_code: None,
            message,
            retry_after: None,
        }
    }

    /// Create a network error (connection refused, timeout).
    pub fn network_error(message: String) -> Self {
        Self {
            kind: ExternalErrorKind::NetworkError,
            status_code: None,
            message,
            retry_after: None,
        }
    }

    /// Create a parse error.
    pub fn parse_error(message: String) -> Self {
        Self {
            kind: ExternalErrorKind::ParseError,
            status_code: None,
            message,
            retry_after: None,
        }
    }

    /// The service handle was never configured.
    pub fn unavailable(message: String) -> Self {
        Self {
            kind: ExternalErrorKind::Unavailable,
            status_code: None,
            message,
            retry_after: None,
        }
    }

    /// Build the error matching an unsuccessful HTTP status.
    pub fn from_status(status_code: u16, body: &str, retry_after: Option<Duration>) -> Self {
        match classify_http_status(status_code) {
            ExternalErrorKind::RateLimited => Self::rate_limited(body.to_string(), retry_after),
            ExternalErrorKind::AuthError => Self::auth_error(status_code, body.to_string()),
            ExternalErrorKind::ClientError => Self::client_error(status_code, body.to_string()),
            _ => Self::server_error(status_code, body.to_string()),
        }
    }

    /// Check if this error is transient and should be retried.
    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    /// Get the suggested delay before retry.
    ///
    /// Returns the `retry_after` if set, otherwise an exponential backoff
    /// based on error kind, capped at 30 seconds.
    pub fn suggested_delay(&self, attempt: u32) -> Duration {
        if let Some(retry_after) = self.retry_after {
            return retry_after;
        }

        let base_delay = match self.kind {
            ExternalErrorKind::RateLimited => Duration::from_secs(2),
            _ => Duration::from_secs(1),
        };

        let multiplier = 2u64.saturating_pow(attempt);
        let delay_secs = base_delay.as_secs().saturating_mul(multiplier);

        Duration::from_secs(delay_secs.min(30))
    }
}

impl std::fmt::Display for ExternalServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "{} (HTTP {}): {}", self.kind, code, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for ExternalServiceError {}

/// Classification of external service errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalErrorKind {
    /// Rate limited (429) - transient
    RateLimited,
    /// Server error (5xx) - transient
    ServerError,
    /// Token expired or scope missing (401, 403) - permanent
    AuthError,
    /// Other 4xx - permanent
    ClientError,
    /// Connection failed or timed out - transient
    NetworkError,
    /// Response body did not match the expected shape
    ParseError,
    /// No authenticated handle was provided
    Unavailable,
}

impl ExternalErrorKind {
    /// Check if this error kind is transient (worth retrying).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ExternalErrorKind::RateLimited
                | ExternalErrorKind::ServerError
                | ExternalErrorKind::NetworkError
        )
    }
}

impl std::fmt::Display for ExternalErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExternalErrorKind::RateLimited => write!(f, "Rate limited"),
            ExternalErrorKind::ServerError => write!(f, "Server error"),
            ExternalErrorKind::AuthError => write!(f, "Auth error"),
            ExternalErrorKind::ClientError => write!(f, "Client error"),
            ExternalErrorKind::NetworkError => write!(f, "Network error"),
            ExternalErrorKind::ParseError => write!(f, "Parse error"),
            ExternalErrorKind::Unavailable => write!(f, "Service unavailable"),
        }
    }
}

/// Configuration for adapter-level retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Maximum total time to spend retrying
    pub max_retry_duration: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            max_retry_duration: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// No retries at all.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            max_retry_duration: Duration::ZERO,
        }
    }

    /// Check if the given error should be retried on this attempt.
    pub fn should_retry(&self, error: &ExternalServiceError, attempt: u32) -> bool {
        error.is_transient() && attempt < self.max_retries
    }
}

/// Parse HTTP status code into error kind.
pub fn classify_http_status(status: u16) -> ExternalErrorKind {
    match status {
        429 => ExternalErrorKind::RateLimited,
        401 | 403 => ExternalErrorKind::AuthError,
        400..=499 => ExternalErrorKind::ClientError,
        _ => ExternalErrorKind::ServerError,
    }
}
