//! Word document model

use crate::id::DocumentId;
use crate::preview::DocumentMetadata;
use serde::{Deserialize, Serialize};

/// One entry in a document's table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocItem {
    /// Anchor id within the rendered HTML.
    pub id: String,
    /// Heading text.
    pub title: String,
    /// Heading level (1 = top).
    pub level: u8,
    /// Nested entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TocItem>,
}

/// Word-processor document rendered to sanitized HTML server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordDocument {
    /// Document id.
    pub id: DocumentId,
    /// Display title.
    pub title: String,
    /// Sanitized HTML body.
    pub html_content: String,
    /// Table of contents, when headings were found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toc: Option<Vec<TocItem>>,
    /// Word count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<u64>,
    /// Page count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u64>,
    /// Free-form tags.
    #[serde(default)]
    pub metadata: DocumentMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toc_roundtrip_preserves_nesting() {
        let doc = WordDocument {
            id: DocumentId::new("rid-7"),
            title: "Policy".to_string(),
            html_content: "<h1 id=\"s1\">Scope</h1>".to_string(),
            toc: Some(vec![TocItem {
                id: "s1".to_string(),
                title: "Scope".to_string(),
                level: 1,
                children: vec![TocItem {
                    id: "s1-1".to_string(),
                    title: "Applicability".to_string(),
                    level: 2,
                    children: Vec::new(),
                }],
            }]),
            word_count: Some(1200),
            page_count: Some(4),
            metadata: DocumentMetadata::empty(),
        };

        let json = serde_json::to_string(&doc).unwrap();
        let back: WordDocument = serde_json::from_str(&json).unwrap();
        let toc = back.toc.unwrap();
        assert_eq!(toc[0].children[0].title, "Applicability");
    }
}
