//! Testing utilities for the citepane workspace
//!
//! A scripted, in-memory [`DocumentApi`] implementation with call
//! counting, per-endpoint failure injection and artificial latency,
//! plus builders for sample documents. Shared by the cache, loader and
//! core test suites.

#![warn(missing_docs)]

use chrono::Utc;
use citepane_client::{ApiError, ApiResult, DocumentApi, FormattingChunk};
use citepane_document::{
    CellRef, CellStyle, Column, DocumentCategory, DocumentId, DocumentMetadata, DocumentPreview,
    FormattingMap, GalleryListing, SessionId, Sheet, SheetName, SpreadsheetDocument, WordDocument,
};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Server-side chunk size mirrored by the fake backend: formatting in a
/// full-document response covers only this many leading rows.
pub const SERVER_CHUNK_SIZE: u32 = 100;

/// How a scripted endpoint should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Answer 404.
    NotFound,
    /// Exceed the deadline.
    Timeout,
    /// Return a malformed payload.
    Parse,
}

impl FailureMode {
    fn to_error(self, id: &DocumentId, context: &str) -> ApiError {
        match self {
            Self::NotFound => ApiError::NotFound(id.clone()),
            Self::Timeout => ApiError::timeout(10_000, context),
            Self::Parse => ApiError::Parse(format!("malformed {context} payload")),
        }
    }
}

/// Per-endpoint invocation counts.
#[derive(Debug, Default)]
pub struct CallCounts {
    /// Preview fetches.
    pub previews: AtomicUsize,
    /// Spreadsheet fetches.
    pub spreadsheets: AtomicUsize,
    /// Formatting-chunk fetches.
    pub chunks: AtomicUsize,
    /// Word fetches.
    pub words: AtomicUsize,
    /// Document-type fetches.
    pub types: AtomicUsize,
    /// Gallery fetches.
    pub galleries: AtomicUsize,
}

/// Scripted in-memory document backend.
#[derive(Debug, Default)]
pub struct FakeDocumentApi {
    previews: DashMap<DocumentId, DocumentPreview>,
    spreadsheets: DashMap<DocumentId, SpreadsheetDocument>,
    words: DashMap<DocumentId, WordDocument>,
    gallery: RwLock<Option<GalleryListing>>,
    spreadsheet_failures: DashMap<DocumentId, FailureMode>,
    word_failures: DashMap<DocumentId, FailureMode>,
    preview_failures: DashMap<DocumentId, FailureMode>,
    chunk_failures: DashMap<(DocumentId, u32), FailureMode>,
    latency: RwLock<Duration>,
    /// Invocation counts, readable by tests.
    pub calls: CallCounts,
}

impl FakeDocumentApi {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty backend wrapped in an `Arc`.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Script a preview payload.
    pub fn insert_preview(&self, preview: DocumentPreview) {
        self.previews.insert(preview.id.clone(), preview);
    }

    /// Script a spreadsheet payload. Stored without formatting; the
    /// fake attaches first-chunk styles when `include_formatting` is
    /// requested, like the real backend.
    pub fn insert_spreadsheet(&self, document: SpreadsheetDocument) {
        self.spreadsheets.insert(document.id.clone(), document);
    }

    /// Script a word payload.
    pub fn insert_word(&self, document: WordDocument) {
        self.words.insert(document.id.clone(), document);
    }

    /// Script the gallery listing.
    pub fn insert_gallery(&self, listing: GalleryListing) {
        *self.gallery.write() = Some(listing);
    }

    /// Make every endpoint sleep this long before answering.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write() = latency;
    }

    /// Fail the next spreadsheet fetches for `id`.
    pub fn fail_spreadsheet(&self, id: DocumentId, mode: FailureMode) {
        self.spreadsheet_failures.insert(id, mode);
    }

    /// Stop failing spreadsheet fetches for `id`.
    pub fn restore_spreadsheet(&self, id: &DocumentId) {
        self.spreadsheet_failures.remove(id);
    }

    /// Fail the next word fetches for `id`.
    pub fn fail_word(&self, id: DocumentId, mode: FailureMode) {
        self.word_failures.insert(id, mode);
    }

    /// Fail the next preview fetches for `id`.
    pub fn fail_preview(&self, id: DocumentId, mode: FailureMode) {
        self.preview_failures.insert(id, mode);
    }

    /// Fail the formatting chunk starting at `start_row` for `id`.
    pub fn fail_chunk(&self, id: DocumentId, start_row: u32, mode: FailureMode) {
        self.chunk_failures.insert((id, start_row), mode);
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.read();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

/// Deterministic style for a synthesized cell: bold, with a background
/// color derived from the row.
#[must_use]
pub fn style_for_row(row: u32) -> CellStyle {
    CellStyle {
        background_color: Some(format!("#f{:05x}", row % 0x100)),
        bold: true,
        ..CellStyle::default()
    }
}

/// Styles for column 0 of rows `start..end`, clamped to `total_rows`.
#[must_use]
pub fn formatting_for_rows(start: u32, end: u32, total_rows: u32) -> FormattingMap {
    (start..end.min(total_rows))
        .map(|row| (CellRef::new(row, 0), style_for_row(row)))
        .collect()
}

#[async_trait::async_trait]
impl DocumentApi for FakeDocumentApi {
    async fn fetch_preview(
        &self,
        _session: &SessionId,
        id: &DocumentId,
    ) -> ApiResult<DocumentPreview> {
        self.calls.previews.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        if let Some(mode) = self.preview_failures.get(id) {
            return Err(mode.to_error(id, "preview"));
        }
        self.previews
            .get(id)
            .map(|p| p.clone())
            .ok_or_else(|| ApiError::NotFound(id.clone()))
    }

    async fn fetch_spreadsheet(
        &self,
        _session: &SessionId,
        id: &DocumentId,
        include_formatting: bool,
    ) -> ApiResult<SpreadsheetDocument> {
        self.calls.spreadsheets.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        if let Some(mode) = self.spreadsheet_failures.get(id) {
            return Err(mode.to_error(id, "spreadsheet"));
        }
        let mut document = self
            .spreadsheets
            .get(id)
            .map(|d| d.clone())
            .ok_or_else(|| ApiError::NotFound(id.clone()))?;
        if include_formatting {
            let active = document.active_sheet.clone();
            if let Some(sheet) = document.sheet_mut(&active) {
                sheet.formatting =
                    formatting_for_rows(0, SERVER_CHUNK_SIZE, sheet.total_row_count);
            }
        }
        Ok(document)
    }

    async fn fetch_formatting_chunk(
        &self,
        _session: &SessionId,
        id: &DocumentId,
        sheet: &SheetName,
        start_row: u32,
        end_row: u32,
    ) -> ApiResult<FormattingChunk> {
        self.calls.chunks.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        if let Some(mode) = self.chunk_failures.get(&(id.clone(), start_row)) {
            return Err(mode.to_error(id, "formatting-chunk"));
        }
        let document = self
            .spreadsheets
            .get(id)
            .map(|d| d.clone())
            .ok_or_else(|| ApiError::NotFound(id.clone()))?;
        let total_rows = document
            .sheet(sheet)
            .map(|s| s.total_row_count)
            .unwrap_or(0);
        let formatting = formatting_for_rows(start_row, end_row, total_rows);
        Ok(FormattingChunk {
            chunk_size: formatting.len() as u32,
            formatting,
            extraction_time_ms: 1,
        })
    }

    async fn fetch_word(&self, _session: &SessionId, id: &DocumentId) -> ApiResult<WordDocument> {
        self.calls.words.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        if let Some(mode) = self.word_failures.get(id) {
            return Err(mode.to_error(id, "word"));
        }
        self.words
            .get(id)
            .map(|d| d.clone())
            .ok_or_else(|| ApiError::NotFound(id.clone()))
    }

    async fn fetch_document_type(
        &self,
        _session: &SessionId,
        id: &DocumentId,
    ) -> ApiResult<DocumentCategory> {
        self.calls.types.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        if self.spreadsheets.contains_key(id) {
            Ok(DocumentCategory::Spreadsheet)
        } else if self.words.contains_key(id) {
            Ok(DocumentCategory::Word)
        } else if let Some(preview) = self.previews.get(id) {
            Ok(preview.category)
        } else {
            Err(ApiError::NotFound(id.clone()))
        }
    }

    async fn fetch_gallery(&self, _session: &SessionId) -> ApiResult<GalleryListing> {
        self.calls.galleries.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        self.gallery
            .read()
            .clone()
            .ok_or_else(|| ApiError::http(500, "gallery"))
    }
}

/// Sample preview for `id`.
#[must_use]
pub fn sample_preview(id: &str, category: DocumentCategory) -> DocumentPreview {
    DocumentPreview {
        id: DocumentId::new(id),
        title: format!("Document {id}"),
        content: "Vendor exposure exceeds the quarterly threshold.".to_string(),
        category,
        metadata: DocumentMetadata::empty()
            .with_domain("procurement")
            .with_risk_category("third-party"),
        created_at: Utc::now(),
    }
}

/// Sample one-sheet spreadsheet for `id` with `total_rows` rows
/// server-side (only a leading window materialized client-side).
#[must_use]
pub fn sample_spreadsheet(id: &str, total_rows: u32) -> SpreadsheetDocument {
    let window = total_rows.min(SERVER_CHUNK_SIZE) as usize;
    let rows = (0..window)
        .map(|i| {
            [("Risk".to_string(), serde_json::json!(format!("risk {i}")))]
                .into_iter()
                .collect()
        })
        .collect();
    SpreadsheetDocument {
        id: DocumentId::new(id),
        title: format!("Register {id}"),
        sheets: vec![Sheet {
            name: SheetName::new("Sheet1"),
            columns: vec![Column::new("Risk")],
            rows,
            total_row_count: total_rows,
            has_more: total_rows > SERVER_CHUNK_SIZE,
            formatting: FormattingMap::new(),
        }],
        active_sheet: SheetName::new("Sheet1"),
        metadata: DocumentMetadata::empty(),
    }
}

/// Sample spreadsheet with several sheets of the given sizes.
#[must_use]
pub fn sample_workbook(id: &str, sheet_rows: &[(&str, u32)]) -> SpreadsheetDocument {
    let sheets = sheet_rows
        .iter()
        .map(|(name, total_rows)| Sheet {
            name: SheetName::new(*name),
            columns: vec![Column::new("Risk")],
            rows: Vec::new(),
            total_row_count: *total_rows,
            has_more: *total_rows > SERVER_CHUNK_SIZE,
            formatting: FormattingMap::new(),
        })
        .collect::<Vec<_>>();
    let active_sheet = sheets
        .first()
        .map(|s| s.name.clone())
        .unwrap_or_else(|| SheetName::new("Sheet1"));
    SpreadsheetDocument {
        id: DocumentId::new(id),
        title: format!("Workbook {id}"),
        sheets,
        active_sheet,
        metadata: DocumentMetadata::empty(),
    }
}

/// Sample word document for `id`.
#[must_use]
pub fn sample_word(id: &str) -> WordDocument {
    WordDocument {
        id: DocumentId::new(id),
        title: format!("Policy {id}"),
        html_content: "<h1>Scope</h1><p>Applies to all suppliers.</p>".to_string(),
        toc: None,
        word_count: Some(420),
        page_count: Some(2),
        metadata: DocumentMetadata::empty(),
    }
}
