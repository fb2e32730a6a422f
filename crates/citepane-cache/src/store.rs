//! Generic expiring key/value store
//!
//! One [`TtlStore`] instance exists per document-type category. Expiry is
//! evaluated at call time on every read regardless of whether a sweep
//! has run; mutation happens under the map's shard lock so readers never
//! observe a half-written entry.

use crate::entry::CacheEntry;
use citepane_document::{DocumentId, SessionId};
use dashmap::DashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

/// Default time-to-live for cached documents.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Composite cache key binding a document to the session it was fetched
/// under. No key from a previous session is ever served.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Session the entry belongs to.
    pub session: SessionId,
    /// Document the entry holds.
    pub document: DocumentId,
}

impl CacheKey {
    /// Create a cache key.
    #[inline]
    #[must_use]
    pub fn new(session: SessionId, document: DocumentId) -> Self {
        Self { session, document }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.session, self.document)
    }
}

/// Expiring key/value store.
pub struct TtlStore<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
    default_ttl: Duration,
}

impl<K, V> std::fmt::Debug for TtlStore<K, V>
where
    K: Eq + Hash + std::fmt::Debug,
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlStore")
            .field("entries", &self.entries)
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl<K, V> TtlStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a store with the default 30-minute TTL.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Create a store with a category-specific TTL.
    #[inline]
    #[must_use]
    pub fn with_ttl(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    /// Look up a key, evaluating expiry at call time. An expired entry
    /// is removed and reported as absent.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.data.clone()),
            Some(entry) => {
                drop(entry);
                self.entries.remove_if(key, |_, e| e.is_expired(now));
                None
            }
            None => None,
        }
    }

    /// Store a value with the store's default TTL, overwriting any
    /// existing entry unconditionally.
    #[inline]
    pub fn set(&self, key: K, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Store a value with an explicit TTL.
    #[inline]
    pub fn set_with_ttl(&self, key: K, value: V, ttl: Duration) {
        self.entries.insert(key, CacheEntry::new(value, ttl));
    }

    /// Mutate a live entry in place, preserving its storage time and
    /// expiry deadline. Returns false when the key is absent or expired.
    ///
    /// The closure runs under the shard lock, so concurrent readers see
    /// either the old or the new value, never an intermediate state.
    pub fn update(&self, key: &K, f: impl FnOnce(&mut V)) -> bool {
        let now = Instant::now();
        match self.entries.get_mut(key) {
            Some(mut entry) if !entry.is_expired(now) => {
                f(&mut entry.data);
                true
            }
            Some(entry) => {
                drop(entry);
                self.entries.remove_if(key, |_, e| e.is_expired(now));
                false
            }
            None => false,
        }
    }

    /// Remove one entry.
    #[inline]
    pub fn invalidate(&self, key: &K) {
        self.entries.remove(key);
    }

    /// Remove every entry.
    #[inline]
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Evict expired entries eagerly. Returns the number evicted.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Number of entries currently held, including any not yet swept.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> Default for TtlStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(session: &str, doc: &str) -> CacheKey {
        CacheKey::new(SessionId::new(session), DocumentId::new(doc))
    }

    #[tokio::test(start_paused = true)]
    async fn get_after_set_within_ttl() {
        let store: TtlStore<CacheKey, String> = TtlStore::with_ttl(Duration::from_secs(10));
        store.set(key("s1", "d1"), "payload".to_string());

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(store.get(&key("s1", "d1")).as_deref(), Some("payload"));
    }

    #[tokio::test(start_paused = true)]
    async fn get_reports_absent_once_ttl_elapsed() {
        let store: TtlStore<CacheKey, String> = TtlStore::with_ttl(Duration::from_secs(10));
        store.set(key("s1", "d1"), "payload".to_string());

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(store.get(&key("s1", "d1")).is_none());
        // Lazy eviction removed the entry on read.
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn set_overwrites_unconditionally() {
        let store: TtlStore<CacheKey, String> = TtlStore::new();
        store.set(key("s1", "d1"), "old".to_string());
        store.set(key("s1", "d1"), "new".to_string());
        assert_eq!(store.get(&key("s1", "d1")).as_deref(), Some("new"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn per_entry_ttl_overrides_default() {
        let store: TtlStore<CacheKey, u32> = TtlStore::with_ttl(Duration::from_secs(600));
        store.set_with_ttl(key("s1", "short"), 1, Duration::from_secs(5));
        store.set(key("s1", "long"), 2);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(store.get(&key("s1", "short")).is_none());
        assert_eq!(store.get(&key("s1", "long")), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn update_preserves_expiry() {
        let store: TtlStore<CacheKey, Vec<u32>> = TtlStore::with_ttl(Duration::from_secs(10));
        store.set(key("s1", "d1"), vec![1]);

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(store.update(&key("s1", "d1"), |v| v.push(2)));

        // The update did not extend the original deadline.
        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(store.get(&key("s1", "d1")).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn update_refuses_expired_entries() {
        let store: TtlStore<CacheKey, u32> = TtlStore::with_ttl(Duration::from_secs(1));
        store.set(key("s1", "d1"), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!store.update(&key("s1", "d1"), |v| *v = 99));
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_evicts_only_expired() {
        let store: TtlStore<CacheKey, u32> = TtlStore::with_ttl(Duration::from_secs(10));
        store.set_with_ttl(key("s1", "a"), 1, Duration::from_secs(2));
        store.set(key("s1", "b"), 2);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.sweep_expired(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&key("s1", "b")), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn keys_from_other_sessions_miss() {
        let store: TtlStore<CacheKey, u32> = TtlStore::new();
        store.set(key("s1", "d1"), 7);
        assert!(store.get(&key("s2", "d1")).is_none());
    }
}
