//! Document preview metadata
//!
//! A preview is the lightweight excerpt shown in the hover card. It is
//! created on the first successful fetch and immutable once cached; a
//! fresh fetch after expiry supersedes it.

use crate::id::DocumentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Broad document category, driving which viewer and fetch path is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentCategory {
    /// Plain text excerpt, cheap to fetch on demand.
    Text,
    /// Spreadsheet with per-cell formatting (expensive to parse).
    Spreadsheet,
    /// Word-processor document rendered to sanitized HTML.
    Word,
    /// PDF document.
    Pdf,
    /// Image document.
    Image,
}

impl DocumentCategory {
    /// Whether this category is expensive enough to warrant speculative
    /// prefetching. Plain text (and pdf/image thumbnails) are fetched on
    /// demand instead.
    #[inline]
    #[must_use]
    pub fn is_prefetchable(self) -> bool {
        matches!(self, Self::Spreadsheet | Self::Word)
    }
}

impl std::fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Spreadsheet => "spreadsheet",
            Self::Word => "word",
            Self::Pdf => "pdf",
            Self::Image => "image",
        };
        write!(f, "{name}")
    }
}

/// Free-form tags attached to a document by the ingestion pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Risk domain the document belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Named entity the document concerns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    /// Risk category tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_category: Option<String>,
    /// Originating source file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    /// Row within the source file, for spreadsheet-derived documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_number: Option<u64>,
}

impl DocumentMetadata {
    /// Metadata with no tags set.
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// With domain tag.
    #[inline]
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// With entity tag.
    #[inline]
    #[must_use]
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// With risk category tag.
    #[inline]
    #[must_use]
    pub fn with_risk_category(mut self, category: impl Into<String>) -> Self {
        self.risk_category = Some(category.into());
        self
    }
}

/// Lightweight document excerpt backing the hover card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPreview {
    /// Document id.
    pub id: DocumentId,
    /// Display title.
    pub title: String,
    /// Text excerpt shown in the card.
    pub content: String,
    /// Category, used to decide the viewer and prefetch policy.
    pub category: DocumentCategory,
    /// Free-form tags.
    #[serde(default)]
    pub metadata: DocumentMetadata,
    /// When the preview was generated server-side.
    pub created_at: DateTime<Utc>,
}
