//! Citepane document model
//!
//! Typed payloads exchanged with the document backend:
//! - Identifier newtypes (document, session, sheet)
//! - Preview excerpts and categories
//! - Spreadsheet documents with sparse, additively-merged formatting
//! - Word documents with table-of-contents trees
//! - Citation gallery listings
//!
//! This crate has no async surface; it is the shared vocabulary of the
//! cache, loader and panel crates.

#![warn(missing_docs)]

pub mod gallery;
pub mod id;
pub mod preview;
pub mod spreadsheet;
pub mod word;

pub use gallery::{GalleryFilters, GalleryItem, GalleryListing};
pub use id::{DocumentId, SessionId, SheetName};
pub use preview::{DocumentCategory, DocumentMetadata, DocumentPreview};
pub use spreadsheet::{
    CellBorders, CellRef, CellStyle, Column, FormattingMap, Sheet, SpreadsheetDocument,
};
pub use word::{TocItem, WordDocument};

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
