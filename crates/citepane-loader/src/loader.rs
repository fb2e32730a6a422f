//! Background formatting loop
//!
//! Extracting cell styles for a large spreadsheet is too slow to block
//! the first render, so the main payload carries only a bounded prefix
//! and this loader streams the rest in fixed-size row chunks. Chunks
//! are requested strictly sequentially with a fixed delay between
//! requests; merges are additive into the cached document. A chunk
//! timeout skips to the next chunk rather than aborting the stream, and
//! results arriving after the user navigated away (or the session
//! changed) are discarded.

use crate::progress::{chunk_range, total_chunks, FormattingProgress};
use citepane_cache::{CacheError, DocumentCacheService};
use citepane_client::DocumentApi;
use citepane_document::{DocumentId, SheetName};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Chunk loop tuning.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Rows per formatting chunk.
    pub chunk_size: u32,
    /// Pause between successive chunk requests, bounding bandwidth.
    pub inter_chunk_delay: Duration,
    /// Deadline for a single chunk fetch.
    pub chunk_timeout: Duration,
}

impl LoaderConfig {
    /// Default tuning: 100-row chunks, 200ms apart, 10s deadline.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a chunk size.
    #[inline]
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: u32) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// With an inter-chunk delay.
    #[inline]
    #[must_use]
    pub fn with_inter_chunk_delay(mut self, delay: Duration) -> Self {
        self.inter_chunk_delay = delay;
        self
    }

    /// With a per-chunk deadline.
    #[inline]
    #[must_use]
    pub fn with_chunk_timeout(mut self, timeout: Duration) -> Self {
        self.chunk_timeout = timeout;
        self
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: 100,
            inter_chunk_delay: Duration::from_millis(200),
            chunk_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug)]
struct ActiveRun {
    handle: tokio::task::AbortHandle,
}

/// Streams per-cell formatting for the sheet currently on screen.
pub struct ChunkedFormattingLoader {
    cache: Arc<DocumentCacheService>,
    api: Arc<dyn DocumentApi>,
    config: LoaderConfig,
    generation: AtomicU64,
    active: Mutex<Option<ActiveRun>>,
    completed: DashMap<(DocumentId, SheetName), ()>,
    chunk_state: DashMap<(DocumentId, SheetName), (u32, u32)>,
    progress_tx: watch::Sender<Option<FormattingProgress>>,
}

impl ChunkedFormattingLoader {
    /// Create a loader over a cache service and backend boundary.
    #[must_use]
    pub fn new(
        cache: Arc<DocumentCacheService>,
        api: Arc<dyn DocumentApi>,
        config: LoaderConfig,
    ) -> Self {
        let (progress_tx, _) = watch::channel(None);
        Self {
            cache,
            api,
            config,
            generation: AtomicU64::new(0),
            active: Mutex::new(None),
            completed: DashMap::new(),
            chunk_state: DashMap::new(),
            progress_tx,
        }
    }

    /// Watch the progress of the active stream.
    #[must_use]
    pub fn progress(&self) -> watch::Receiver<Option<FormattingProgress>> {
        self.progress_tx.subscribe()
    }

    /// Chunk progress recorded for one sheet, as
    /// `(loaded_chunks, total_chunks)`.
    #[must_use]
    pub fn chunk_progress(&self, id: &DocumentId, sheet: &SheetName) -> Option<(u32, u32)> {
        self.chunk_state
            .get(&(id.clone(), sheet.clone()))
            .map(|entry| *entry)
    }

    /// Whether every chunk of a sheet has been merged.
    #[must_use]
    pub fn is_complete(&self, id: &DocumentId, sheet: &SheetName) -> bool {
        self.completed.contains_key(&(id.clone(), sheet.clone()))
    }

    /// Begin (or resume) streaming formatting for one sheet of a cached
    /// spreadsheet, replacing any stream already running.
    ///
    /// No loop is started when the sheet's remaining chunks are already
    /// covered: the prefix delivered with the payload is all there is,
    /// or the sheet completed on an earlier activation. Returns the
    /// handle of the spawned loop for callers that need to await or
    /// abort it.
    pub fn start(
        self: &Arc<Self>,
        id: &DocumentId,
        sheet: &SheetName,
    ) -> Option<JoinHandle<()>> {
        let session = match self.cache.current_session() {
            Some(session) => session,
            None => {
                tracing::warn!(%id, "cannot stream formatting: no session bound");
                return None;
            }
        };
        let document = match self.cache.spreadsheet(id) {
            Some(document) => document,
            None => {
                tracing::warn!(%id, "cannot stream formatting: spreadsheet not cached");
                return None;
            }
        };
        let target = match document.sheet(sheet) {
            Some(target) => target,
            None => {
                tracing::warn!(%id, %sheet, "sheet not present in document");
                return None;
            }
        };

        let chunk_size = self.config.chunk_size;
        let total = total_chunks(target.total_row_count, chunk_size);
        // The payload fetch delivers the first chunk's styles; a sheet
        // that arrived bare (prefetch path) starts from row zero.
        let start_chunk = if target.formatting.is_empty() { 0 } else { 1 };

        if self.is_complete(id, sheet) || start_chunk >= total {
            self.completed.insert((id.clone(), sheet.clone()), ());
            self.record_progress(id, sheet, total, total);
            return None;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let loader = Arc::clone(self);
        let run_id = id.clone();
        let run_sheet = sheet.clone();
        let total_rows = target.total_row_count;
        self.record_progress(id, sheet, start_chunk, total);
        tracing::debug!(
            %id,
            %sheet,
            start_chunk,
            total_chunks = total,
            "starting formatting stream"
        );

        let handle = tokio::spawn(async move {
            let mut merged = start_chunk;
            for index in start_chunk..total {
                if index > start_chunk {
                    tokio::time::sleep(loader.config.inter_chunk_delay).await;
                }
                if loader.generation.load(Ordering::SeqCst) != generation {
                    tracing::debug!(id = %run_id, sheet = %run_sheet, "stream superseded");
                    return;
                }

                let (start_row, end_row) = chunk_range(index, chunk_size, total_rows);
                let fetch = loader.api.fetch_formatting_chunk(
                    &session,
                    &run_id,
                    &run_sheet,
                    start_row,
                    end_row,
                );
                let chunk = match tokio::time::timeout(loader.config.chunk_timeout, fetch).await {
                    Ok(Ok(chunk)) => chunk,
                    Ok(Err(err)) => {
                        tracing::warn!(
                            id = %run_id,
                            sheet = %run_sheet,
                            start_row,
                            %err,
                            "chunk fetch failed, continuing"
                        );
                        continue;
                    }
                    Err(_) => {
                        tracing::warn!(
                            id = %run_id,
                            sheet = %run_sheet,
                            start_row,
                            timeout_ms = loader.config.chunk_timeout.as_millis() as u64,
                            "chunk fetch timed out, continuing"
                        );
                        continue;
                    }
                };

                // The result may be stale by the time it arrives.
                if loader.generation.load(Ordering::SeqCst) != generation {
                    tracing::debug!(
                        id = %run_id,
                        sheet = %run_sheet,
                        start_row,
                        "discarding chunk for superseded stream"
                    );
                    return;
                }

                match loader.cache.merge_formatting(
                    &session,
                    &run_id,
                    &run_sheet,
                    chunk.formatting,
                ) {
                    Ok(Some(cells_added)) => {
                        merged += 1;
                        tracing::debug!(
                            id = %run_id,
                            sheet = %run_sheet,
                            start_row,
                            cells_added,
                            extraction_time_ms = chunk.extraction_time_ms,
                            "chunk merged"
                        );
                        loader.record_progress(&run_id, &run_sheet, merged, total);
                    }
                    Ok(None) => {
                        tracing::debug!(
                            id = %run_id,
                            sheet = %run_sheet,
                            "document left the cache, stopping stream"
                        );
                        return;
                    }
                    Err(err @ CacheError::SessionMismatch { .. }) => {
                        tracing::debug!(id = %run_id, %err, "discarding stale chunk");
                        return;
                    }
                    Err(err) => {
                        tracing::warn!(id = %run_id, %err, "stopping stream");
                        return;
                    }
                }
            }

            if merged >= total {
                loader
                    .completed
                    .insert((run_id.clone(), run_sheet.clone()), ());
                tracing::debug!(id = %run_id, sheet = %run_sheet, "formatting stream complete");
            }
        });

        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            previous.handle.abort();
        }
        *active = Some(ActiveRun {
            handle: handle.abort_handle(),
        });
        drop(active);
        Some(handle)
    }

    /// Stop the active stream, if any. Late results from the aborted
    /// run are discarded by the generation check.
    pub fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(run) = self.active.lock().take() {
            run.handle.abort();
        }
    }

    /// Drop all per-sheet progress in addition to stopping the active
    /// stream. Called when the session changes: completed-sheet state
    /// must not carry over to documents fetched under a new session.
    pub fn reset(&self) {
        self.stop();
        self.completed.clear();
        self.chunk_state.clear();
        let _ = self.progress_tx.send(None);
    }

    fn record_progress(&self, id: &DocumentId, sheet: &SheetName, loaded: u32, total: u32) {
        self.chunk_state
            .insert((id.clone(), sheet.clone()), (loaded, total));
        let _ = self.progress_tx.send(Some(FormattingProgress {
            document: id.clone(),
            sheet: sheet.clone(),
            loaded_chunks: loaded,
            total_chunks: total,
        }));
    }
}

impl std::fmt::Debug for ChunkedFormattingLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedFormattingLoader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
