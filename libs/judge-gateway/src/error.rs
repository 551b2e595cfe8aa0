use std::time::Duration;
use thiserror::Error;

/// Errors that cross the gateway boundary.
///
/// `Unavailable` comes from the circuit breaker and never touched the
/// network. `Timeout`, `Transport`, `Upstream` and `InvalidResponse` are
/// upstream reliability failures and have already been counted against the
/// breaker by the time the caller sees them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Judge service unavailable, retry in {}ms", .retry_after.as_millis())]
    Unavailable { retry_after: Duration },
    #[error("Judge request timed out: {0}")]
    Timeout(String),
    #[error("Judge transport error: {0}")]
    Transport(String),
    #[error("Judge returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("Invalid judge response: {0}")]
    InvalidResponse(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, GatewayError::Unavailable { .. })
    }

    /// Whether the caller may reasonably retry later
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Unavailable { .. }
            | GatewayError::Timeout(_)
            | GatewayError::Transport(_) => true,
            GatewayError::Upstream { status, .. } => *status >= 500 || *status == 429,
            GatewayError::InvalidResponse(_) | GatewayError::Config(_) => false,
        }
    }

    /// Short stable label, used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Unavailable { .. } => "unavailable",
            GatewayError::Timeout(_) => "timeout",
            GatewayError::Transport(_) => "transport",
            GatewayError::Upstream { .. } => "upstream",
            GatewayError::InvalidResponse(_) => "invalid_response",
            GatewayError::Config(_) => "config",
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            GatewayError::Upstream {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else if err.is_decode() {
            GatewayError::InvalidResponse(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let unavailable = GatewayError::Unavailable {
            retry_after: Duration::from_secs(3),
        };
        assert!(unavailable.is_unavailable());
        assert!(unavailable.is_retryable());

        let bad_request = GatewayError::Upstream {
            status: 422,
            body: "language_id is invalid".to_string(),
        };
        assert!(!bad_request.is_retryable());
        assert!(GatewayError::Upstream { status: 503, body: String::new() }.is_retryable());
        assert!(!GatewayError::InvalidResponse("eof".to_string()).is_retryable());
    }

    #[test]
    fn test_unavailable_message_reports_wait() {
        let err = GatewayError::Unavailable {
            retry_after: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "Judge service unavailable, retry in 1500ms");
    }
}
