//! Citepane backend boundary
//!
//! Defines the [`DocumentApi`] contract the cache and loader layers
//! depend on, the error taxonomy for fetch failures, and the reqwest
//! implementation against the REST endpoints.

#![warn(missing_docs)]

pub mod api;
pub mod error;
pub mod http;

pub use api::{DocumentApi, DocumentTypeResponse, FormattingChunk};
pub use error::{ApiError, ApiResult};
pub use http::HttpDocumentApi;

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
