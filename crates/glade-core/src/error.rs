//! Error types shared by every layer of the cache.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use thiserror::Error;

/// Unified error type for the cache layer.
///
/// Cache misses and disabled-cache writes are *not* errors: they surface as
/// `None` / `false` return values. Everything here is a genuine failure that
/// the caller has to deal with.
#[derive(Error, Debug)]
pub enum CacheError {
    // ============ Infrastructure Errors ============
    /// The backing store could not be reached or rejected a command.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The store answered with a reply that does not fit the command.
    #[error("Unexpected store reply: {0}")]
    UnexpectedReply(String),

    // ============ Construction Errors ============
    /// A cache or store was built with an unusable configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    // ============ Value Errors ============
    /// A value could not be encoded to, or decoded from, the wire format.
    #[error("Serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),

    // ============ Caller Errors ============
    /// A caller-supplied compute function failed.
    #[error("Compute function failed: {0}")]
    ComputeFailure(anyhow::Error),
}

impl CacheError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::UnexpectedReply(_) => "UNEXPECTED_REPLY",
            Self::InvalidConfiguration(_) => "INVALID_CONFIGURATION",
            Self::Serialization(_) => "SERIALIZATION_FAILURE",
            Self::ComputeFailure(_) => "COMPUTE_FAILURE",
        }
    }

    /// Creates a store-unavailable error from any displayable cause.
    #[must_use]
    pub fn store_unavailable<T: Display>(cause: T) -> Self {
        Self::StoreUnavailable(cause.to_string())
    }

    /// Creates an unexpected-reply error.
    #[must_use]
    pub fn unexpected_reply<T: Into<String>>(message: T) -> Self {
        Self::UnexpectedReply(message.into())
    }

    /// Creates an invalid-configuration error.
    #[must_use]
    pub fn invalid_configuration<T: Into<String>>(message: T) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    /// Wraps the failure of a compute function.
    #[must_use]
    pub fn compute<E: Into<anyhow::Error>>(err: E) -> Self {
        Self::ComputeFailure(err.into())
    }

    /// Checks if the failed operation may succeed when retried.
    ///
    /// The cache never retries on its own; this is a hint for callers.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

/// Serializable error summary, handy for the request layer's error bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl From<&CacheError> for ErrorResponse {
    fn from(error: &CacheError) -> Self {
        Self {
            code: error.error_code().to_string(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(CacheError::store_unavailable("refused").error_code(), "STORE_UNAVAILABLE");
        assert_eq!(CacheError::invalid_configuration("max").error_code(), "INVALID_CONFIGURATION");
        assert_eq!(CacheError::unexpected_reply("nope").error_code(), "UNEXPECTED_REPLY");
        assert_eq!(
            CacheError::compute(anyhow::anyhow!("boom")).error_code(),
            "COMPUTE_FAILURE"
        );
    }

    #[test]
    fn test_serialization_from_serde() {
        let err = serde_json::from_str::<u32>("not json").unwrap_err();
        let cache_err = CacheError::from(err);
        assert_eq!(cache_err.error_code(), "SERIALIZATION_FAILURE");
    }

    #[test]
    fn test_retriable_errors() {
        assert!(CacheError::store_unavailable("connection reset").is_retriable());
        assert!(!CacheError::invalid_configuration("max must be positive").is_retriable());
        assert!(!CacheError::compute(anyhow::anyhow!("db down")).is_retriable());
    }

    #[test]
    fn test_error_display() {
        let err = CacheError::store_unavailable("connection refused");
        assert_eq!(err.to_string(), "Store unavailable: connection refused");

        let err = CacheError::compute(anyhow::anyhow!("something went wrong"));
        assert!(err.to_string().contains("something went wrong"));
    }

    #[test]
    fn test_error_response_from_ref() {
        let err = CacheError::invalid_configuration("max number of items must be specified");
        let response = ErrorResponse::from(&err);
        assert_eq!(response.code, "INVALID_CONFIGURATION");
        assert!(response.message.contains("max number of items"));
    }
}
