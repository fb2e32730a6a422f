//! Citepane chunked formatting loader
//!
//! Streams per-cell spreadsheet formatting in bounded row chunks on a
//! self-throttling background loop, merging each chunk additively into
//! the cached document the renderer reads. See [`ChunkedFormattingLoader`].

#![warn(missing_docs)]

pub mod loader;
pub mod progress;

pub use loader::{ChunkedFormattingLoader, LoaderConfig};
pub use progress::{chunk_range, total_chunks, FormattingProgress};

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
