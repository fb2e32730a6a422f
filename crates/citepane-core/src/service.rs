//! Preview service facade
//!
//! Wires the cache, prefetch coordinator, chunk loader and panel state
//! machine into the flows the UI drives: hover a citation, open the
//! slideout, navigate inside it, switch sheets. Explicitly constructed
//! and shared as an `Arc`; nothing here is global.

use crate::config::PreviewConfig;
use crate::error::OpenError;
use citepane_cache::{DocumentCacheService, DocumentEvent, PrefetchCoordinator};
use citepane_client::{ApiError, ApiResult, DocumentApi};
use citepane_document::{
    DocumentCategory, DocumentId, DocumentPreview, GalleryListing, SessionId, SheetName,
    SpreadsheetDocument, WordDocument,
};
use citepane_loader::ChunkedFormattingLoader;
use citepane_panel::{HoverEvent, HoverTrigger, PanelNavigator, PanelState};
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

async fn with_deadline<T>(
    deadline: Duration,
    context: &'static str,
    fut: impl Future<Output = ApiResult<T>>,
) -> ApiResult<T> {
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(ApiError::timeout(deadline.as_millis() as u64, context)),
    }
}

/// Facade over the preview subsystem.
pub struct PreviewService {
    config: PreviewConfig,
    cache: Arc<DocumentCacheService>,
    api: Arc<dyn DocumentApi>,
    prefetch: PrefetchCoordinator,
    loader: Arc<ChunkedFormattingLoader>,
    panel: RwLock<PanelNavigator>,
}

impl PreviewService {
    /// Create a service over a backend boundary with the given tuning.
    #[must_use]
    pub fn new(api: Arc<dyn DocumentApi>, config: PreviewConfig) -> Arc<Self> {
        let cache = Arc::new(DocumentCacheService::with_config(config.cache_config()));
        let prefetch = PrefetchCoordinator::new(Arc::clone(&cache), Arc::clone(&api));
        let loader = Arc::new(ChunkedFormattingLoader::new(
            Arc::clone(&cache),
            Arc::clone(&api),
            config.loader_config(),
        ));
        Arc::new(Self {
            config,
            cache,
            api,
            prefetch,
            loader,
            panel: RwLock::new(PanelNavigator::new()),
        })
    }

    /// The cache service backing this facade.
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &Arc<DocumentCacheService> {
        &self.cache
    }

    /// The chunk loader backing this facade.
    #[inline]
    #[must_use]
    pub fn loader(&self) -> &Arc<ChunkedFormattingLoader> {
        &self.loader
    }

    /// The prefetch coordinator backing this facade.
    #[inline]
    #[must_use]
    pub fn prefetch(&self) -> &PrefetchCoordinator {
        &self.prefetch
    }

    /// Bind the current session, invalidating all caches and per-sheet
    /// loader progress when it changes.
    pub fn set_session(&self, id: SessionId) {
        let changed = self.cache.current_session().as_ref() != Some(&id);
        self.cache.set_session(id);
        if changed {
            self.loader.reset();
        }
    }

    /// Subscribe to cache change events.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DocumentEvent> {
        self.cache.subscribe()
    }

    /// Spawn the periodic expired-entry sweep at the configured
    /// interval.
    pub fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
        self.cache.spawn_sweeper(self.config.sweep_interval)
    }

    /// Snapshot of the panel state.
    #[must_use]
    pub fn panel_state(&self) -> PanelState {
        self.panel.read().state().clone()
    }

    /// Current navigation counter; bumps on every open/navigate, even
    /// for the document already displayed.
    #[must_use]
    pub fn navigation_counter(&self) -> u64 {
        self.panel.read().navigation_counter()
    }

    /// Preview for the hover card: cache hit or fetch-and-store. As a
    /// side effect, kicks off a background prefetch of the full payload
    /// for expensive categories.
    pub async fn hover_preview(&self, id: &DocumentId) -> Result<DocumentPreview, OpenError> {
        let preview = self.fetch_preview_cached(id).await?;

        if preview.category.is_prefetchable() {
            let prefetch = self.prefetch.clone();
            let prefetch_id = id.clone();
            let category = preview.category;
            tokio::spawn(async move {
                prefetch.prefetch(&prefetch_id, category).await;
            });
        }
        Ok(preview)
    }

    async fn fetch_preview_cached(&self, id: &DocumentId) -> Result<DocumentPreview, OpenError> {
        if let Some(cached) = self.cache.preview(id) {
            return Ok(cached);
        }
        let session = self.cache.require_session()?;
        let preview = with_deadline(
            self.config.open_timeout,
            "preview",
            self.api.fetch_preview(&session, id),
        )
        .await?;
        if let Err(err) = self.cache.store_preview(&session, id, preview.clone()) {
            tracing::warn!(%id, %err, "discarding fetched preview");
        }
        Ok(preview)
    }

    /// Resolve a document's category: the cached preview knows it,
    /// otherwise the type endpoint is asked.
    pub async fn resolve_category(&self, id: &DocumentId) -> Result<DocumentCategory, OpenError> {
        if let Some(preview) = self.cache.preview(id) {
            return Ok(preview.category);
        }
        let session = self.cache.require_session()?;
        let category = with_deadline(
            self.config.open_timeout,
            "document-type",
            self.api.fetch_document_type(&session, id),
        )
        .await?;
        Ok(category)
    }

    /// Open the slideout panel on a document. Loads the payload for its
    /// category (joining any pending prefetch), drives the panel state
    /// machine, and starts the formatting stream for spreadsheets.
    pub async fn open_document(&self, id: &DocumentId) -> Result<DocumentCategory, OpenError> {
        let category = self.resolve_category(id).await?;
        match category {
            DocumentCategory::Spreadsheet => {
                let document = self.load_spreadsheet(id).await?;
                self.panel.write().open_panel(id.clone());
                self.loader.start(id, &document.active_sheet);
            }
            DocumentCategory::Word => {
                self.load_word(id).await?;
                self.panel.write().open_panel(id.clone());
            }
            DocumentCategory::Text | DocumentCategory::Pdf | DocumentCategory::Image => {
                self.fetch_preview_cached(id).await?;
                self.panel.write().open_panel(id.clone());
            }
        }
        tracing::info!(%id, %category, "panel opened");
        Ok(category)
    }

    /// Navigate the open panel to another document (following a
    /// citation inside the displayed one). Same loading as
    /// [`Self::open_document`] with history-aware panel semantics.
    pub async fn navigate_to(&self, id: &DocumentId) -> Result<DocumentCategory, OpenError> {
        let category = self.resolve_category(id).await?;
        match category {
            DocumentCategory::Spreadsheet => {
                let document = self.load_spreadsheet(id).await?;
                self.panel.write().navigate_to(id.clone());
                self.loader.start(id, &document.active_sheet);
            }
            DocumentCategory::Word => {
                self.load_word(id).await?;
                self.panel.write().navigate_to(id.clone());
            }
            DocumentCategory::Text | DocumentCategory::Pdf | DocumentCategory::Image => {
                self.fetch_preview_cached(id).await?;
                self.panel.write().navigate_to(id.clone());
            }
        }
        Ok(category)
    }

    /// Load a spreadsheet payload: cache hit, join of a pending
    /// prefetch, or a fresh fetch with first-chunk formatting. Errors
    /// propagate to the caller, unlike the prefetch path.
    pub async fn load_spreadsheet(
        &self,
        id: &DocumentId,
    ) -> Result<SpreadsheetDocument, OpenError> {
        if let Some(cached) = self.cache.spreadsheet(id) {
            tracing::debug!(%id, "spreadsheet served from cache");
            return Ok(cached);
        }
        let session = self.cache.require_session()?;
        let key = self.cache.key_for(id)?;
        let api = Arc::clone(&self.api);
        let cache = Arc::clone(&self.cache);
        let deadline = self.config.open_timeout;
        let fetch_session = session.clone();
        let fetch_id = id.clone();
        let document = self
            .cache
            .spreadsheet_flights()
            .fetch_or_join(key, move || async move {
                let document = with_deadline(
                    deadline,
                    "spreadsheet",
                    api.fetch_spreadsheet(&fetch_session, &fetch_id, true),
                )
                .await?;
                if let Err(err) =
                    cache.store_spreadsheet(&fetch_session, &fetch_id, document.clone())
                {
                    tracing::warn!(id = %fetch_id, %err, "discarding fetched spreadsheet");
                }
                Ok(document)
            })
            .await?;
        Ok(document)
    }

    /// Load a word payload with the same semantics as
    /// [`Self::load_spreadsheet`].
    pub async fn load_word(&self, id: &DocumentId) -> Result<WordDocument, OpenError> {
        if let Some(cached) = self.cache.word(id) {
            tracing::debug!(%id, "word document served from cache");
            return Ok(cached);
        }
        let session = self.cache.require_session()?;
        let key = self.cache.key_for(id)?;
        let api = Arc::clone(&self.api);
        let cache = Arc::clone(&self.cache);
        let deadline = self.config.open_timeout;
        let fetch_session = session.clone();
        let fetch_id = id.clone();
        let document = self
            .cache
            .word_flights()
            .fetch_or_join(key, move || async move {
                let document = with_deadline(
                    deadline,
                    "word",
                    api.fetch_word(&fetch_session, &fetch_id),
                )
                .await?;
                if let Err(err) = cache.store_word(&fetch_session, &fetch_id, document.clone()) {
                    tracing::warn!(id = %fetch_id, %err, "discarding fetched word document");
                }
                Ok(document)
            })
            .await?;
        Ok(document)
    }

    /// Gallery listing for the current session, cached.
    pub async fn load_gallery(&self) -> Result<GalleryListing, OpenError> {
        if let Some(cached) = self.cache.gallery() {
            return Ok(cached);
        }
        let session = self.cache.require_session()?;
        let listing = with_deadline(
            self.config.open_timeout,
            "gallery",
            self.api.fetch_gallery(&session),
        )
        .await?;
        if let Err(err) = self.cache.store_gallery(&session, listing.clone()) {
            tracing::warn!(%err, "discarding fetched gallery");
        }
        Ok(listing)
    }

    /// Switch the visible sheet of an open spreadsheet, starting an
    /// independent formatting stream for it. Sheets whose chunks are
    /// already complete are not re-fetched.
    pub fn switch_sheet(&self, id: &DocumentId, sheet: &SheetName) {
        self.loader.start(id, sheet);
    }

    /// Ambient close (clicking outside). A no-op while pinned.
    pub fn close_panel(&self) {
        self.panel.write().close_panel();
        if !self.panel.read().is_open() {
            self.loader.stop();
        }
    }

    /// Explicit close: unpins, closes, and stops any formatting stream.
    pub fn force_close(&self) {
        self.panel.write().force_close();
        self.loader.stop();
    }

    /// Flip the pin state.
    pub fn toggle_pin(&self) {
        self.panel.write().toggle_pin();
    }

    /// Step back in panel history. Returns the document now displayed.
    pub fn go_back(&self) -> Option<DocumentId> {
        let mut panel = self.panel.write();
        panel.go_back();
        panel.current().cloned()
    }

    /// Step forward in panel history. Returns the document now
    /// displayed.
    pub fn go_forward(&self) -> Option<DocumentId> {
        let mut panel = self.panel.write();
        panel.go_forward();
        panel.current().cloned()
    }

    /// Create a hover trigger wired to this service: fired opens fetch
    /// the preview (and prefetch expensive payloads); close events are
    /// surfaced to the UI via the panel-agnostic event stream. Returns
    /// the trigger and the worker task handle.
    pub fn spawn_hover_worker(
        self: &Arc<Self>,
    ) -> (HoverTrigger, tokio::task::JoinHandle<()>) {
        let (trigger, mut events) = HoverTrigger::new(self.config.hover_config());
        let service = Arc::clone(self);
        let worker = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    HoverEvent::Open(id) => {
                        if let Err(err) = service.hover_preview(&id).await {
                            tracing::warn!(%id, %err, "hover preview failed");
                        }
                    }
                    HoverEvent::Close(id) => {
                        tracing::debug!(%id, "hover preview closed");
                    }
                }
            }
        });
        (trigger, worker)
    }
}

impl std::fmt::Debug for PreviewService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
