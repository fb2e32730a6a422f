//! Opportunistic prefetch
//!
//! Warms the cache for documents with expensive server-side parsing
//! (spreadsheet, word) before the user performs the action that needs
//! them. Prefetch failures are non-fatal: the user has not asked for the
//! document yet, so errors are logged and swallowed. An explicit open
//! that arrives while the prefetch is pending joins the same flight via
//! the shared in-flight registry.

use crate::service::DocumentCacheService;
use citepane_client::DocumentApi;
use citepane_document::{DocumentCategory, DocumentId, SpreadsheetDocument, WordDocument};
use std::sync::Arc;

/// Coordinates speculative background fetches.
#[derive(Clone)]
pub struct PrefetchCoordinator {
    cache: Arc<DocumentCacheService>,
    api: Arc<dyn DocumentApi>,
}

impl PrefetchCoordinator {
    /// Create a coordinator over a cache service and backend boundary.
    #[must_use]
    pub fn new(cache: Arc<DocumentCacheService>, api: Arc<dyn DocumentApi>) -> Self {
        Self { cache, api }
    }

    /// Prefetch the payload for `id` if its category warrants it.
    /// Plain-text, pdf and image documents are cheap enough to fetch on
    /// demand and are skipped.
    pub async fn prefetch(&self, id: &DocumentId, category: DocumentCategory) {
        match category {
            DocumentCategory::Spreadsheet => {
                self.prefetch_spreadsheet(id).await;
            }
            DocumentCategory::Word => {
                self.prefetch_word(id).await;
            }
            _ => {
                tracing::debug!(%id, %category, "category not prefetchable, skipping");
            }
        }
    }

    /// Prefetch a spreadsheet payload, without formatting for maximum
    /// speed (styles are an enhancement streamed in on open). Returns
    /// the payload when the prefetch succeeded or was already cached.
    pub async fn prefetch_spreadsheet(&self, id: &DocumentId) -> Option<SpreadsheetDocument> {
        let session = match self.cache.current_session() {
            Some(session) => session,
            None => {
                tracing::warn!(%id, "cannot prefetch spreadsheet: no session bound");
                return None;
            }
        };

        if let Some(cached) = self.cache.spreadsheet(id) {
            tracing::debug!(%id, "spreadsheet already cached, skipping prefetch");
            return Some(cached);
        }

        let key = self.cache.key_for(id).ok()?;
        let started = std::time::Instant::now();
        let api = Arc::clone(&self.api);
        let cache = Arc::clone(&self.cache);
        let fetch_session = session.clone();
        let fetch_id = id.clone();
        let result = self
            .cache
            .spreadsheet_flights()
            .fetch_or_join(key, move || async move {
                let document = api
                    .fetch_spreadsheet(&fetch_session, &fetch_id, false)
                    .await?;
                if let Err(err) = cache.store_spreadsheet(&fetch_session, &fetch_id, document.clone())
                {
                    tracing::warn!(id = %fetch_id, %err, "discarding prefetched spreadsheet");
                }
                Ok(document)
            })
            .await;

        match result {
            Ok(document) => {
                tracing::debug!(
                    %id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "spreadsheet prefetch completed"
                );
                Some(document)
            }
            Err(err) => {
                tracing::warn!(%id, %err, "spreadsheet prefetch failed");
                None
            }
        }
    }

    /// Prefetch a word payload. Returns the payload when the prefetch
    /// succeeded or was already cached.
    pub async fn prefetch_word(&self, id: &DocumentId) -> Option<WordDocument> {
        let session = match self.cache.current_session() {
            Some(session) => session,
            None => {
                tracing::warn!(%id, "cannot prefetch word document: no session bound");
                return None;
            }
        };

        if let Some(cached) = self.cache.word(id) {
            tracing::debug!(%id, "word document already cached, skipping prefetch");
            return Some(cached);
        }

        let key = self.cache.key_for(id).ok()?;
        let started = std::time::Instant::now();
        let api = Arc::clone(&self.api);
        let cache = Arc::clone(&self.cache);
        let fetch_session = session.clone();
        let fetch_id = id.clone();
        let result = self
            .cache
            .word_flights()
            .fetch_or_join(key, move || async move {
                let document = api.fetch_word(&fetch_session, &fetch_id).await?;
                if let Err(err) = cache.store_word(&fetch_session, &fetch_id, document.clone()) {
                    tracing::warn!(id = %fetch_id, %err, "discarding prefetched word document");
                }
                Ok(document)
            })
            .await;

        match result {
            Ok(document) => {
                tracing::debug!(
                    %id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "word prefetch completed"
                );
                Some(document)
            }
            Err(err) => {
                tracing::warn!(%id, %err, "word prefetch failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for PrefetchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefetchCoordinator").finish_non_exhaustive()
    }
}
