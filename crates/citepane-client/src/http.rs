//! HTTP implementation of the document backend boundary

use crate::api::{DocumentApi, DocumentTypeResponse, FormattingChunk};
use crate::error::{ApiError, ApiResult};
use citepane_document::{
    DocumentCategory, DocumentId, DocumentPreview, GalleryListing, SessionId, SheetName,
    SpreadsheetDocument, WordDocument,
};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default per-request deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the document endpoints.
#[derive(Debug, Clone)]
pub struct HttpDocumentApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDocumentApi {
    /// Create a client against `base_url` with the default timeout.
    ///
    /// # Errors
    /// Returns [`ApiError::Transport`] if the underlying client cannot
    /// be constructed.
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client with a custom per-request deadline.
    ///
    /// # Errors
    /// Returns [`ApiError::Transport`] if the underlying client cannot
    /// be constructed.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: String,
        query: &[(&str, String)],
        id: Option<&DocumentId>,
        context: &str,
    ) -> ApiResult<T> {
        let started = std::time::Instant::now();
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ApiError::timeout(started.elapsed().as_millis() as u64, context)
                } else {
                    ApiError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(ApiError::NotFound(id.clone()));
            }
        }
        if !status.is_success() {
            return Err(ApiError::http(status.as_u16(), context));
        }

        let payload = response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        tracing::debug!(
            context,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fetch completed"
        );
        Ok(payload)
    }
}

#[async_trait::async_trait]
impl DocumentApi for HttpDocumentApi {
    async fn fetch_preview(
        &self,
        session: &SessionId,
        id: &DocumentId,
    ) -> ApiResult<DocumentPreview> {
        let url = format!("{}/document/{}/preview", self.base_url, id);
        self.get_json(
            url,
            &[("session_id", session.to_string())],
            Some(id),
            "preview",
        )
        .await
    }

    async fn fetch_spreadsheet(
        &self,
        session: &SessionId,
        id: &DocumentId,
        include_formatting: bool,
    ) -> ApiResult<SpreadsheetDocument> {
        let url = format!("{}/document/{}/excel", self.base_url, id);
        self.get_json(
            url,
            &[
                ("session_id", session.to_string()),
                ("include_formatting", include_formatting.to_string()),
            ],
            Some(id),
            "spreadsheet",
        )
        .await
    }

    async fn fetch_formatting_chunk(
        &self,
        session: &SessionId,
        id: &DocumentId,
        sheet: &SheetName,
        start_row: u32,
        end_row: u32,
    ) -> ApiResult<FormattingChunk> {
        let url = format!("{}/document/{}/excel/formatting-chunk", self.base_url, id);
        self.get_json(
            url,
            &[
                ("session_id", session.to_string()),
                ("sheet", sheet.to_string()),
                ("start_row", start_row.to_string()),
                ("end_row", end_row.to_string()),
            ],
            Some(id),
            "formatting-chunk",
        )
        .await
    }

    async fn fetch_word(&self, session: &SessionId, id: &DocumentId) -> ApiResult<WordDocument> {
        let url = format!("{}/document/{}/word", self.base_url, id);
        self.get_json(url, &[("session_id", session.to_string())], Some(id), "word")
            .await
    }

    async fn fetch_document_type(
        &self,
        session: &SessionId,
        id: &DocumentId,
    ) -> ApiResult<DocumentCategory> {
        let url = format!("{}/document/{}/type", self.base_url, id);
        let resp: DocumentTypeResponse = self
            .get_json(
                url,
                &[("session_id", session.to_string())],
                Some(id),
                "document-type",
            )
            .await?;
        Ok(resp.category)
    }

    async fn fetch_gallery(&self, session: &SessionId) -> ApiResult<GalleryListing> {
        let url = format!("{}/session/{}/gallery", self.base_url, session);
        self.get_json(url, &[], None, "gallery").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_stripped() {
        let api = HttpDocumentApi::new("http://localhost:8080/api/").unwrap();
        assert_eq!(api.base_url, "http://localhost:8080/api");
    }
}
