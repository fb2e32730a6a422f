//! Error surface of the preview service
//!
//! Explicit open and navigation failures reach the UI through
//! [`OpenError`], preserving the original message so the retry affordance
//! can show it.

use citepane_cache::{CacheError, FetchError};
use citepane_client::ApiError;

/// Failure of an explicit open, navigation or gallery load.
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    /// No session has been bound yet.
    #[error("no session bound")]
    NoSession,

    /// A deduplicated payload fetch failed.
    #[error("{0}")]
    Fetch(#[from] FetchError),

    /// A direct backend call failed.
    #[error("{0}")]
    Api(#[from] ApiError),
}

impl OpenError {
    /// Whether the UI should offer a retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NoSession => false,
            Self::Fetch(err) => err.is_retryable(),
            Self::Api(err) => err.is_retryable(),
        }
    }
}

impl From<CacheError> for OpenError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::NoSession => Self::NoSession,
            CacheError::SessionMismatch { captured, .. } => {
                Self::Api(ApiError::SessionMismatch { stale: captured })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use citepane_document::DocumentId;

    #[test]
    fn timeout_is_retryable_and_keeps_its_message() {
        let err = OpenError::from(ApiError::timeout(60_000, "spreadsheet"));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn not_found_is_not_retryable() {
        let err = OpenError::from(ApiError::NotFound(DocumentId::new("rid-1")));
        assert!(!err.is_retryable());
    }

    #[test]
    fn cache_errors_map_into_the_taxonomy() {
        assert!(matches!(
            OpenError::from(CacheError::NoSession),
            OpenError::NoSession
        ));
        let mapped = OpenError::from(CacheError::SessionMismatch {
            captured: "s1".to_string(),
            current: "s2".to_string(),
        });
        assert!(matches!(
            mapped,
            OpenError::Api(ApiError::SessionMismatch { .. })
        ));
    }
}
