//! Preview service configuration

use citepane_cache::CacheConfig;
use citepane_loader::LoaderConfig;
use citepane_panel::HoverConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning for the whole preview subsystem. Deserializable so a host can
/// ship overrides; every knob has a production default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// TTL for cached document payloads, all categories.
    pub document_ttl: Duration,
    /// Deadline for an explicit full-document open fetch.
    pub open_timeout: Duration,
    /// Dwell time before a hover preview opens.
    pub hover_open_delay: Duration,
    /// Grace period before an open hover preview closes.
    pub hover_close_delay: Duration,
    /// Rows per formatting chunk.
    pub chunk_size: u32,
    /// Pause between successive chunk requests.
    pub inter_chunk_delay: Duration,
    /// Deadline for a single chunk fetch.
    pub chunk_timeout: Duration,
    /// Period of the expired-entry sweep.
    pub sweep_interval: Duration,
}

impl PreviewConfig {
    /// Production defaults.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a document TTL.
    #[inline]
    #[must_use]
    pub fn with_document_ttl(mut self, ttl: Duration) -> Self {
        self.document_ttl = ttl;
        self
    }

    /// With an open deadline.
    #[inline]
    #[must_use]
    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    /// With a chunk size.
    #[inline]
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: u32) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Cache layer view of this configuration.
    #[must_use]
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .with_preview_ttl(self.document_ttl)
            .with_spreadsheet_ttl(self.document_ttl)
            .with_word_ttl(self.document_ttl)
            .with_gallery_ttl(self.document_ttl)
    }

    /// Loader view of this configuration.
    #[must_use]
    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig::new()
            .with_chunk_size(self.chunk_size)
            .with_inter_chunk_delay(self.inter_chunk_delay)
            .with_chunk_timeout(self.chunk_timeout)
    }

    /// Hover trigger view of this configuration.
    #[must_use]
    pub fn hover_config(&self) -> HoverConfig {
        HoverConfig::new()
            .with_open_delay(self.hover_open_delay)
            .with_close_delay(self.hover_close_delay)
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            document_ttl: Duration::from_secs(30 * 60),
            open_timeout: Duration::from_secs(60),
            hover_open_delay: Duration::from_millis(300),
            hover_close_delay: Duration::from_millis(150),
            chunk_size: 100,
            inter_chunk_delay: Duration::from_millis(200),
            chunk_timeout: Duration::from_secs(10),
            sweep_interval: Duration::from_secs(5 * 60),
        }
    }
}
