//! Cache entry with time-to-live

use std::time::Duration;
use tokio::time::Instant;

/// A cached value with its storage time and expiry deadline.
///
/// An entry is valid iff `now < expires_at`; expired entries are treated
/// as absent and evicted lazily on the next read or by the periodic
/// sweep.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The cached value.
    pub data: T,
    /// When the entry was stored.
    pub stored_at: Instant,
    /// When the entry stops being served.
    pub expires_at: Instant,
}

impl<T> CacheEntry<T> {
    /// Create an entry valid for `ttl` from now.
    #[inline]
    #[must_use]
    pub fn new(data: T, ttl: Duration) -> Self {
        let stored_at = Instant::now();
        Self {
            data,
            stored_at,
            expires_at: stored_at + ttl,
        }
    }

    /// Whether the entry has passed its expiry deadline.
    #[inline]
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}
