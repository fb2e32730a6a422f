//! Error types for the cache layer

use citepane_client::ApiError;
use std::sync::Arc;

/// Outcome of a deduplicated fetch, shared verbatim among every caller
/// that joined the flight.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// The backend call failed; every joiner observes the same error.
    #[error("{0}")]
    Api(Arc<ApiError>),

    /// The flight was dropped before settling (e.g. the registry was
    /// cleared by a session change).
    #[error("request aborted before completion")]
    Aborted,
}

impl FetchError {
    /// The underlying backend error, when one exists.
    #[inline]
    #[must_use]
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            Self::Aborted => None,
        }
    }

    /// Whether retrying the same request may succeed.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api(err) => err.is_retryable(),
            Self::Aborted => true,
        }
    }
}

impl From<ApiError> for FetchError {
    fn from(err: ApiError) -> Self {
        Self::Api(Arc::new(err))
    }
}

/// Errors raised by cache service operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// No session has been bound yet; every cache key needs one.
    #[error("no session bound")]
    NoSession,

    /// An operation captured a session that is no longer current; its
    /// result was discarded rather than stored under the new session.
    #[error("session mismatch: captured {captured}, current {current}")]
    SessionMismatch {
        /// Session the operation started under.
        captured: String,
        /// Session bound at completion time.
        current: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use citepane_document::DocumentId;

    #[test]
    fn fetch_error_preserves_api_message() {
        let err = FetchError::from(ApiError::NotFound(DocumentId::new("rid-1")));
        assert_eq!(err.to_string(), "document not found: rid-1");
        assert!(err.as_api().is_some());
        assert!(!err.is_retryable());
    }

    #[test]
    fn aborted_is_retryable() {
        assert!(FetchError::Aborted.is_retryable());
        assert!(FetchError::Aborted.as_api().is_none());
    }
}
