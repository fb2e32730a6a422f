//! Citepane core
//!
//! The [`PreviewService`] facade behind the citation hover/slideout
//! experience:
//! - hover a citation: debounced preview fetch plus speculative
//!   prefetch of expensive payloads
//! - open a citation: cache-first payload load that joins any pending
//!   prefetch, panel state transitions, and progressive formatting
//!   streaming for large spreadsheets
//! - navigate inside the panel: browser-style history with a
//!   re-navigation counter
//!
//! # Example
//!
//! ```rust,ignore
//! use citepane_client::HttpDocumentApi;
//! use citepane_core::{PreviewConfig, PreviewService};
//! use citepane_document::{DocumentId, SessionId};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let api = Arc::new(HttpDocumentApi::new("http://localhost:8080/api")?);
//! let service = PreviewService::new(api, PreviewConfig::default());
//! service.set_session(SessionId::new("session-1"));
//!
//! let category = service.open_document(&DocumentId::new("rid-1")).await?;
//! println!("opened a {category} document");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod service;

pub use config::PreviewConfig;
pub use error::OpenError;
pub use service::PreviewService;

/// Prelude module for common imports.
pub mod prelude {
    //! Common imports for working with the preview service.
    pub use crate::{OpenError, PreviewConfig, PreviewService};
    pub use citepane_cache::{DocumentCacheService, DocumentEvent};
    pub use citepane_document::{DocumentCategory, DocumentId, SessionId};
    pub use citepane_panel::{HoverEvent, HoverTrigger, PanelState};
}

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
