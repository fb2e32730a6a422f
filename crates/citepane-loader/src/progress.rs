//! Chunk progress accounting

use citepane_document::{DocumentId, SheetName};

/// Readiness of one sheet's formatting stream, for a non-blocking
/// "still loading formatting" indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattingProgress {
    /// Document being streamed.
    pub document: DocumentId,
    /// Sheet being streamed.
    pub sheet: SheetName,
    /// Chunks merged so far, counting the prefix delivered with the
    /// main payload.
    pub loaded_chunks: u32,
    /// Total chunks the sheet spans.
    pub total_chunks: u32,
}

impl FormattingProgress {
    /// Whether every chunk has been merged.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.loaded_chunks >= self.total_chunks
    }

    /// Fraction of chunks merged, in `0.0..=1.0`.
    #[inline]
    #[must_use]
    pub fn ratio(&self) -> f32 {
        if self.total_chunks == 0 {
            1.0
        } else {
            self.loaded_chunks as f32 / self.total_chunks as f32
        }
    }
}

/// Number of chunks needed to cover `total_rows` rows.
#[inline]
#[must_use]
pub fn total_chunks(total_rows: u32, chunk_size: u32) -> u32 {
    total_rows.div_ceil(chunk_size)
}

/// Row range `[start, end)` covered by chunk `index`.
#[inline]
#[must_use]
pub fn chunk_range(index: u32, chunk_size: u32, total_rows: u32) -> (u32, u32) {
    let start = index * chunk_size;
    (start, (start + chunk_size).min(total_rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_counts() {
        assert_eq!(total_chunks(0, 100), 0);
        assert_eq!(total_chunks(100, 100), 1);
        assert_eq!(total_chunks(101, 100), 2);
        assert_eq!(total_chunks(350, 100), 4);
    }

    #[test]
    fn chunk_ranges_clamp_to_total() {
        assert_eq!(chunk_range(0, 100, 350), (0, 100));
        assert_eq!(chunk_range(3, 100, 350), (300, 350));
    }

    #[test]
    fn progress_ratio() {
        let progress = FormattingProgress {
            document: DocumentId::new("d1"),
            sheet: SheetName::new("Sheet1"),
            loaded_chunks: 1,
            total_chunks: 4,
        };
        assert!(!progress.is_complete());
        assert!((progress.ratio() - 0.25).abs() < f32::EPSILON);
    }
}
