//! Citepane cache layer
//!
//! Serves a previously fetched document in well under the 200ms budget,
//! never issues duplicate network requests for the same document, and
//! binds everything to the current session:
//! - [`TtlStore`]: generic expiring key/value store, one per category
//! - [`DocumentCacheService`]: session guard over all categories
//! - [`InFlightRegistry`]: concurrent-fetch deduplication
//! - [`PrefetchCoordinator`]: speculative warming for expensive
//!   categories
//! - [`ChangeNotifier`]: mutation events for reactive consumers

#![warn(missing_docs)]

pub mod entry;
pub mod error;
pub mod inflight;
pub mod notify;
pub mod prefetch;
pub mod service;
pub mod store;

pub use entry::CacheEntry;
pub use error::{CacheError, FetchError};
pub use inflight::InFlightRegistry;
pub use notify::{ChangeNotifier, DocumentEvent};
pub use prefetch::PrefetchCoordinator;
pub use service::{CacheConfig, CacheStats, DocumentCacheService};
pub use store::{CacheKey, TtlStore, DEFAULT_TTL};

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
