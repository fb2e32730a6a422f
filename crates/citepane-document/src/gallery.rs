//! Citation gallery listing
//!
//! The gallery is a per-session overview of every document cited so far,
//! with facet lists for filtering. It is cached as its own category and
//! never prefetched.

use crate::id::DocumentId;
use crate::preview::{DocumentCategory, DocumentMetadata};
use serde::{Deserialize, Serialize};

/// One cited document in the gallery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryItem {
    /// Document id.
    pub id: DocumentId,
    /// Display title.
    pub title: String,
    /// Document category.
    pub category: DocumentCategory,
    /// Free-form tags.
    #[serde(default)]
    pub metadata: DocumentMetadata,
    /// Retrieval relevance score, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
}

/// Facet values available for filtering the gallery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryFilters {
    /// Risk domains present in the listing.
    #[serde(default)]
    pub domains: Vec<String>,
    /// File types present in the listing.
    #[serde(default)]
    pub file_types: Vec<String>,
    /// Entities present in the listing.
    #[serde(default)]
    pub entities: Vec<String>,
    /// Risk categories present in the listing.
    #[serde(default)]
    pub risk_categories: Vec<String>,
}

/// Gallery listing for the current session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryListing {
    /// Cited documents.
    pub items: Vec<GalleryItem>,
    /// Total count server-side.
    pub total_count: u64,
    /// Filter facets.
    #[serde(default)]
    pub filters: GalleryFilters,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_roundtrip() {
        let listing = GalleryListing {
            items: vec![GalleryItem {
                id: DocumentId::new("rid-9"),
                title: "Controls matrix".to_string(),
                category: DocumentCategory::Spreadsheet,
                metadata: DocumentMetadata::empty().with_domain("compliance"),
                relevance_score: Some(0.91),
            }],
            total_count: 1,
            filters: GalleryFilters {
                domains: vec!["compliance".to_string()],
                ..GalleryFilters::default()
            },
        };

        let json = serde_json::to_string(&listing).unwrap();
        let back: GalleryListing = serde_json::from_str(&json).unwrap();
        assert_eq!(back.items.len(), 1);
        assert_eq!(back.filters.domains, vec!["compliance".to_string()]);
    }
}
