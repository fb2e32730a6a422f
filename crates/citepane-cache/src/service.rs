//! Session-scoped document cache service
//!
//! One store per document-type category, all bound to the current
//! session id. Changing the session drops every entry and every pending
//! flight before the new id becomes visible, so no caller ever observes
//! a partially cleared cache or a value from a previous session.
//!
//! The service is explicitly constructed and passed around as an `Arc`;
//! there is no global instance.

use crate::error::CacheError;
use crate::inflight::InFlightRegistry;
use crate::notify::{ChangeNotifier, DocumentEvent};
use crate::store::{CacheKey, TtlStore, DEFAULT_TTL};
use citepane_document::{
    DocumentId, DocumentPreview, FormattingMap, GalleryListing, SessionId, SheetName,
    SpreadsheetDocument, WordDocument,
};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

/// Per-category time-to-live configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for preview excerpts.
    pub preview_ttl: Duration,
    /// TTL for spreadsheet payloads.
    pub spreadsheet_ttl: Duration,
    /// TTL for word payloads.
    pub word_ttl: Duration,
    /// TTL for gallery listings.
    pub gallery_ttl: Duration,
}

impl CacheConfig {
    /// Configuration with every category at the 30-minute default.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a preview TTL.
    #[inline]
    #[must_use]
    pub fn with_preview_ttl(mut self, ttl: Duration) -> Self {
        self.preview_ttl = ttl;
        self
    }

    /// With a spreadsheet TTL.
    #[inline]
    #[must_use]
    pub fn with_spreadsheet_ttl(mut self, ttl: Duration) -> Self {
        self.spreadsheet_ttl = ttl;
        self
    }

    /// With a word TTL.
    #[inline]
    #[must_use]
    pub fn with_word_ttl(mut self, ttl: Duration) -> Self {
        self.word_ttl = ttl;
        self
    }

    /// With a gallery TTL.
    #[inline]
    #[must_use]
    pub fn with_gallery_ttl(mut self, ttl: Duration) -> Self {
        self.gallery_ttl = ttl;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            preview_ttl: DEFAULT_TTL,
            spreadsheet_ttl: DEFAULT_TTL,
            word_ttl: DEFAULT_TTL,
            gallery_ttl: DEFAULT_TTL,
        }
    }
}

/// Per-category entry counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Cached preview excerpts.
    pub previews: usize,
    /// Cached spreadsheet payloads.
    pub spreadsheets: usize,
    /// Cached word payloads.
    pub words: usize,
    /// Cached gallery listings.
    pub galleries: usize,
}

impl CacheStats {
    /// Total entries across categories.
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.previews + self.spreadsheets + self.words + self.galleries
    }
}

/// Session-scoped cache over every document category.
#[derive(Debug)]
pub struct DocumentCacheService {
    session: RwLock<Option<SessionId>>,
    previews: TtlStore<CacheKey, DocumentPreview>,
    spreadsheets: TtlStore<CacheKey, SpreadsheetDocument>,
    words: TtlStore<CacheKey, WordDocument>,
    galleries: TtlStore<SessionId, GalleryListing>,
    spreadsheet_flights: InFlightRegistry<CacheKey, SpreadsheetDocument>,
    word_flights: InFlightRegistry<CacheKey, WordDocument>,
    notifier: ChangeNotifier,
}

impl DocumentCacheService {
    /// Create a service with default TTLs.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Create a service with per-category TTLs.
    #[must_use]
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            session: RwLock::new(None),
            previews: TtlStore::with_ttl(config.preview_ttl),
            spreadsheets: TtlStore::with_ttl(config.spreadsheet_ttl),
            words: TtlStore::with_ttl(config.word_ttl),
            galleries: TtlStore::with_ttl(config.gallery_ttl),
            spreadsheet_flights: InFlightRegistry::new(),
            word_flights: InFlightRegistry::new(),
            notifier: ChangeNotifier::new(),
        }
    }

    /// Bind the current session. A change of session clears every
    /// category and every pending flight before the new id becomes
    /// visible; binding the same id again is a no-op.
    pub fn set_session(&self, id: SessionId) {
        let mut session = self.session.write();
        if session.as_ref() == Some(&id) {
            return;
        }
        if session.is_some() {
            tracing::info!(new_session = %id, "session changed, invalidating caches");
        }
        self.previews.clear();
        self.spreadsheets.clear();
        self.words.clear();
        self.galleries.clear();
        self.spreadsheet_flights.clear();
        self.word_flights.clear();
        self.notifier.publish(DocumentEvent::SessionInvalidated);
        *session = Some(id);
    }

    /// The currently bound session, if any.
    #[must_use]
    pub fn current_session(&self) -> Option<SessionId> {
        self.session.read().clone()
    }

    /// The currently bound session, or [`CacheError::NoSession`].
    pub fn require_session(&self) -> Result<SessionId, CacheError> {
        self.current_session().ok_or(CacheError::NoSession)
    }

    /// Cache key for a document under the current session.
    pub fn key_for(&self, id: &DocumentId) -> Result<CacheKey, CacheError> {
        Ok(CacheKey::new(self.require_session()?, id.clone()))
    }

    fn check_current(&self, captured: &SessionId) -> Result<(), CacheError> {
        let current = self.require_session()?;
        if &current == captured {
            Ok(())
        } else {
            Err(CacheError::SessionMismatch {
                captured: captured.to_string(),
                current: current.to_string(),
            })
        }
    }

    /// Cached preview for a document, if present and live.
    #[must_use]
    pub fn preview(&self, id: &DocumentId) -> Option<DocumentPreview> {
        let key = self.key_for(id).ok()?;
        self.previews.get(&key)
    }

    /// Store a preview fetched under `session`. Rejected with
    /// [`CacheError::SessionMismatch`] when the session has changed
    /// since the fetch began.
    pub fn store_preview(
        &self,
        session: &SessionId,
        id: &DocumentId,
        preview: DocumentPreview,
    ) -> Result<(), CacheError> {
        self.check_current(session)?;
        self.previews
            .set(CacheKey::new(session.clone(), id.clone()), preview);
        self.notifier
            .publish(DocumentEvent::PreviewStored { id: id.clone() });
        Ok(())
    }

    /// Cached spreadsheet payload, if present and live.
    #[must_use]
    pub fn spreadsheet(&self, id: &DocumentId) -> Option<SpreadsheetDocument> {
        let key = self.key_for(id).ok()?;
        self.spreadsheets.get(&key)
    }

    /// Store a spreadsheet fetched under `session`.
    pub fn store_spreadsheet(
        &self,
        session: &SessionId,
        id: &DocumentId,
        document: SpreadsheetDocument,
    ) -> Result<(), CacheError> {
        self.check_current(session)?;
        self.spreadsheets
            .set(CacheKey::new(session.clone(), id.clone()), document);
        self.notifier
            .publish(DocumentEvent::SpreadsheetStored { id: id.clone() });
        Ok(())
    }

    /// Cached word payload, if present and live.
    #[must_use]
    pub fn word(&self, id: &DocumentId) -> Option<WordDocument> {
        let key = self.key_for(id).ok()?;
        self.words.get(&key)
    }

    /// Store a word payload fetched under `session`.
    pub fn store_word(
        &self,
        session: &SessionId,
        id: &DocumentId,
        document: WordDocument,
    ) -> Result<(), CacheError> {
        self.check_current(session)?;
        self.words
            .set(CacheKey::new(session.clone(), id.clone()), document);
        self.notifier
            .publish(DocumentEvent::WordStored { id: id.clone() });
        Ok(())
    }

    /// Cached gallery listing for the current session.
    #[must_use]
    pub fn gallery(&self) -> Option<GalleryListing> {
        let session = self.current_session()?;
        self.galleries.get(&session)
    }

    /// Store the gallery listing fetched under `session`.
    pub fn store_gallery(
        &self,
        session: &SessionId,
        listing: GalleryListing,
    ) -> Result<(), CacheError> {
        self.check_current(session)?;
        self.galleries.set(session.clone(), listing);
        self.notifier.publish(DocumentEvent::GalleryStored);
        Ok(())
    }

    /// Merge a formatting chunk into the cached spreadsheet for `id`,
    /// additively. Returns `Ok(None)` when the document is no longer
    /// cached (evicted or expired) so the caller can stop streaming.
    pub fn merge_formatting(
        &self,
        session: &SessionId,
        id: &DocumentId,
        sheet: &SheetName,
        chunk: FormattingMap,
    ) -> Result<Option<usize>, CacheError> {
        self.check_current(session)?;
        let key = CacheKey::new(session.clone(), id.clone());
        let mut added = None;
        self.spreadsheets.update(&key, |doc| {
            if let Some(target) = doc.sheet_mut(sheet) {
                added = Some(target.formatting.merge(chunk));
            }
        });
        if let Some(cells_added) = added {
            self.notifier.publish(DocumentEvent::FormattingMerged {
                id: id.clone(),
                sheet: sheet.clone(),
                cells_added,
            });
        }
        Ok(added)
    }

    /// Pending spreadsheet fetches, shared between prefetch and open.
    #[inline]
    #[must_use]
    pub fn spreadsheet_flights(&self) -> &InFlightRegistry<CacheKey, SpreadsheetDocument> {
        &self.spreadsheet_flights
    }

    /// Pending word fetches, shared between prefetch and open.
    #[inline]
    #[must_use]
    pub fn word_flights(&self) -> &InFlightRegistry<CacheKey, WordDocument> {
        &self.word_flights
    }

    /// Subscribe to cache change events.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DocumentEvent> {
        self.notifier.subscribe()
    }

    /// Evict expired entries across every category. Returns the number
    /// evicted.
    pub fn sweep_expired(&self) -> usize {
        self.previews.sweep_expired()
            + self.spreadsheets.sweep_expired()
            + self.words.sweep_expired()
            + self.galleries.sweep_expired()
    }

    /// Per-category entry counts.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            previews: self.previews.len(),
            spreadsheets: self.spreadsheets.len(),
            words: self.words.len(),
            galleries: self.galleries.len(),
        }
    }

    /// Spawn a background task sweeping expired entries every
    /// `interval`. Abort the returned handle to stop it.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick fires immediately; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = service.sweep_expired();
                if evicted > 0 {
                    tracing::debug!(evicted, "cache sweep");
                }
            }
        })
    }
}

impl Default for DocumentCacheService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use citepane_document::{CellRef, CellStyle, DocumentCategory, DocumentMetadata};

    fn preview(id: &str) -> DocumentPreview {
        DocumentPreview {
            id: DocumentId::new(id),
            title: format!("doc {id}"),
            content: "excerpt".to_string(),
            category: DocumentCategory::Text,
            metadata: DocumentMetadata::empty(),
            created_at: Utc::now(),
        }
    }

    fn spreadsheet(id: &str, sheet: &str, total_rows: u32) -> SpreadsheetDocument {
        SpreadsheetDocument {
            id: DocumentId::new(id),
            title: format!("sheet {id}"),
            sheets: vec![citepane_document::Sheet {
                name: SheetName::new(sheet),
                columns: Vec::new(),
                rows: Vec::new(),
                total_row_count: total_rows,
                has_more: false,
                formatting: FormattingMap::new(),
            }],
            active_sheet: SheetName::new(sheet),
            metadata: DocumentMetadata::empty(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn store_and_read_back_under_same_session() {
        let cache = DocumentCacheService::new();
        cache.set_session(SessionId::new("s1"));
        let session = cache.current_session().unwrap();

        cache
            .store_preview(&session, &DocumentId::new("d1"), preview("d1"))
            .unwrap();
        assert!(cache.preview(&DocumentId::new("d1")).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn session_change_makes_prior_entries_unreachable() {
        let cache = DocumentCacheService::new();
        cache.set_session(SessionId::new("s1"));
        let s1 = cache.current_session().unwrap();
        cache
            .store_preview(&s1, &DocumentId::new("d1"), preview("d1"))
            .unwrap();

        cache.set_session(SessionId::new("s2"));
        assert!(cache.preview(&DocumentId::new("d1")).is_none());
        assert_eq!(cache.stats().total(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rebinding_the_same_session_keeps_entries() {
        let cache = DocumentCacheService::new();
        cache.set_session(SessionId::new("s1"));
        let s1 = cache.current_session().unwrap();
        cache
            .store_preview(&s1, &DocumentId::new("d1"), preview("d1"))
            .unwrap();

        cache.set_session(SessionId::new("s1"));
        assert!(cache.preview(&DocumentId::new("d1")).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_session_store_is_rejected() {
        let cache = DocumentCacheService::new();
        cache.set_session(SessionId::new("s1"));
        let s1 = cache.current_session().unwrap();

        cache.set_session(SessionId::new("s2"));
        let result = cache.store_preview(&s1, &DocumentId::new("d1"), preview("d1"));
        assert!(matches!(result, Err(CacheError::SessionMismatch { .. })));
        assert!(cache.preview(&DocumentId::new("d1")).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn store_without_session_is_rejected() {
        let cache = DocumentCacheService::new();
        let result = cache.store_preview(
            &SessionId::new("s1"),
            &DocumentId::new("d1"),
            preview("d1"),
        );
        assert!(matches!(result, Err(CacheError::NoSession)));
    }

    #[tokio::test(start_paused = true)]
    async fn merge_formatting_is_additive_and_notifies() {
        let cache = DocumentCacheService::new();
        cache.set_session(SessionId::new("s1"));
        let session = cache.current_session().unwrap();
        let id = DocumentId::new("d1");
        let sheet = SheetName::new("Sheet1");
        cache
            .store_spreadsheet(&session, &id, spreadsheet("d1", "Sheet1", 350))
            .unwrap();
        let mut rx = cache.subscribe();

        let chunk: FormattingMap = (100..200)
            .map(|row| (CellRef::new(row, 0), CellStyle::default()))
            .collect();
        let added = cache
            .merge_formatting(&session, &id, &sheet, chunk)
            .unwrap();
        assert_eq!(added, Some(100));

        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event,
            DocumentEvent::FormattingMerged { cells_added: 100, .. }
        ));

        let doc = cache.spreadsheet(&id).unwrap();
        assert_eq!(doc.sheets[0].formatting.len(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn merge_into_missing_document_reports_none() {
        let cache = DocumentCacheService::new();
        cache.set_session(SessionId::new("s1"));
        let session = cache.current_session().unwrap();

        let added = cache
            .merge_formatting(
                &session,
                &DocumentId::new("gone"),
                &SheetName::new("Sheet1"),
                FormattingMap::new(),
            )
            .unwrap();
        assert!(added.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_evicts_expired_entries() {
        let cache = Arc::new(DocumentCacheService::with_config(
            CacheConfig::default().with_preview_ttl(Duration::from_secs(60)),
        ));
        cache.set_session(SessionId::new("s1"));
        let session = cache.current_session().unwrap();
        cache
            .store_preview(&session, &DocumentId::new("d1"), preview("d1"))
            .unwrap();

        let sweeper = cache.spawn_sweeper(Duration::from_secs(300));
        // Let the sweeper register its interval before the clock moves.
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(301)).await;
        tokio::task::yield_now().await;

        assert_eq!(cache.stats().total(), 0);
        sweeper.abort();
    }
}
