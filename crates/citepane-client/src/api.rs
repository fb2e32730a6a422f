//! Document backend contract
//!
//! The backend parses the source files and serves JSON payloads; this
//! side only caches and displays them. Implementations: [`crate::http::HttpDocumentApi`]
//! for production, the scripted fake in `citepane-test-utils` for tests.

use crate::error::ApiResult;
use citepane_document::{
    DocumentCategory, DocumentId, DocumentPreview, FormattingMap, GalleryListing, SessionId,
    SheetName, SpreadsheetDocument, WordDocument,
};
use serde::{Deserialize, Serialize};

/// One streamed window of per-cell formatting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormattingChunk {
    /// Styles for cells within the requested row range.
    pub formatting: FormattingMap,
    /// Row span the server actually covered.
    pub chunk_size: u32,
    /// Server-side extraction time, for diagnostics.
    #[serde(default)]
    pub extraction_time_ms: u64,
}

/// Response of the document-type endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTypeResponse {
    /// Resolved category.
    #[serde(rename = "type")]
    pub category: DocumentCategory,
}

/// Asynchronous boundary to the document backend.
///
/// All calls are session-scoped; the backend resolves ids within the
/// given session's citation set.
#[async_trait::async_trait]
pub trait DocumentApi: Send + Sync {
    /// Fetch the lightweight preview excerpt for a document.
    async fn fetch_preview(
        &self,
        session: &SessionId,
        id: &DocumentId,
    ) -> ApiResult<DocumentPreview>;

    /// Fetch a spreadsheet payload. With `include_formatting`, the
    /// server attaches styles for the first chunk of rows only; the
    /// remainder arrives via [`Self::fetch_formatting_chunk`].
    async fn fetch_spreadsheet(
        &self,
        session: &SessionId,
        id: &DocumentId,
        include_formatting: bool,
    ) -> ApiResult<SpreadsheetDocument>;

    /// Fetch formatting for rows `start_row..end_row` of one sheet.
    async fn fetch_formatting_chunk(
        &self,
        session: &SessionId,
        id: &DocumentId,
        sheet: &SheetName,
        start_row: u32,
        end_row: u32,
    ) -> ApiResult<FormattingChunk>;

    /// Fetch a word-document payload.
    async fn fetch_word(&self, session: &SessionId, id: &DocumentId) -> ApiResult<WordDocument>;

    /// Resolve the category of a document.
    async fn fetch_document_type(
        &self,
        session: &SessionId,
        id: &DocumentId,
    ) -> ApiResult<DocumentCategory>;

    /// Fetch the citation gallery for a session.
    async fn fetch_gallery(&self, session: &SessionId) -> ApiResult<GalleryListing>;
}
