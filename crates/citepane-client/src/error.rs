//! Error taxonomy for the backend boundary
//!
//! Prefetch callers swallow these (logged, non-fatal); explicit open
//! callers surface them to the UI as a retryable error state with the
//! original message preserved.

use citepane_document::DocumentId;

/// Errors returned by the document backend boundary.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Document id unknown to the backend.
    #[error("document not found: {0}")]
    NotFound(DocumentId),

    /// Fetch exceeded its deadline.
    #[error("request timed out after {elapsed_ms}ms: {context}")]
    Timeout {
        /// How long the request ran before the deadline.
        elapsed_ms: u64,
        /// What was being fetched.
        context: String,
    },

    /// Payload did not match the expected shape.
    #[error("malformed payload: {0}")]
    Parse(String),

    /// Backend answered with an unexpected HTTP status.
    #[error("http status {status}: {context}")]
    Http {
        /// Status code.
        status: u16,
        /// What was being fetched.
        context: String,
    },

    /// Connection-level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Result belongs to a session that is no longer current.
    #[error("session mismatch: result for stale session {stale}")]
    SessionMismatch {
        /// The session the result was fetched under.
        stale: String,
    },
}

impl ApiError {
    /// Create a timeout error.
    #[inline]
    pub fn timeout(elapsed_ms: u64, context: impl Into<String>) -> Self {
        Self::Timeout {
            elapsed_ms,
            context: context.into(),
        }
    }

    /// Create an HTTP status error.
    #[inline]
    pub fn http(status: u16, context: impl Into<String>) -> Self {
        Self::Http {
            status,
            context: context.into(),
        }
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Not-found and malformed payloads are permanent for a given
    /// document; timeouts and transport faults are worth retrying.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Transport(_) | Self::Http { status: 500..=599, .. }
        )
    }
}

/// Result type alias for backend operations.
pub type ApiResult<T> = Result<T, ApiError>;
