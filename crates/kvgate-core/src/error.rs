//! Shared error type across kvgate crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Missing or malformed request field. Not retryable.
    BadRequest,
    /// The backing store could not be reached. May be transient.
    StoreUnavailable,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::StoreUnavailable => "STORE_UNAVAILABLE",
            ClientCode::Internal => "INTERNAL",
        }
    }

    /// Whether a caller may reasonably retry the same request.
    pub fn is_retryable(self) -> bool {
        matches!(self, ClientCode::StoreUnavailable)
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Unified error type used by core and gateway.
///
/// A missing key is not represented here: lookups that find nothing are a
/// normal outcome and are answered without going through the error path.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            GatewayError::BadRequest(_) => ClientCode::BadRequest,
            GatewayError::StoreUnavailable(_) => ClientCode::StoreUnavailable,
            GatewayError::Internal(_) => ClientCode::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_store_failures_are_retryable() {
        assert!(GatewayError::StoreUnavailable("refused".into())
            .client_code()
            .is_retryable());
        assert!(!GatewayError::BadRequest("missing key".into())
            .client_code()
            .is_retryable());
        assert!(!GatewayError::Internal("boom".into())
            .client_code()
            .is_retryable());
    }

    #[test]
    fn display_carries_detail() {
        let err = GatewayError::BadRequest("missing field `value`".into());
        assert_eq!(err.to_string(), "bad request: missing field `value`");
        assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
    }
}
