//! Cache change notifications
//!
//! Cache mutation publishes a [`DocumentEvent`] so viewers can re-read
//! the entry they display. Consumers subscribe explicitly and
//! unsubscribe by dropping the receiver; publishing never blocks on slow
//! subscribers.

use citepane_document::{DocumentId, SheetName};
use tokio::sync::broadcast;

/// Default buffered event capacity per subscriber.
const CHANNEL_CAPACITY: usize = 64;

/// A change to the document cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// A preview excerpt was stored.
    PreviewStored {
        /// Affected document.
        id: DocumentId,
    },
    /// A spreadsheet payload was stored.
    SpreadsheetStored {
        /// Affected document.
        id: DocumentId,
    },
    /// A word payload was stored.
    WordStored {
        /// Affected document.
        id: DocumentId,
    },
    /// The gallery listing was stored.
    GalleryStored,
    /// A formatting chunk was merged into a cached spreadsheet.
    FormattingMerged {
        /// Affected document.
        id: DocumentId,
        /// Sheet the chunk covered.
        sheet: SheetName,
        /// Number of newly styled cells.
        cells_added: usize,
    },
    /// Every entry was dropped because the session changed.
    SessionInvalidated,
}

/// Broadcast hub for cache change events.
#[derive(Debug)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<DocumentEvent>,
}

impl ChangeNotifier {
    /// Create a notifier.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to subsequent events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. A send with no live subscribers is not an
    /// error.
    pub fn publish(&self, event: DocumentEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of live subscribers.
    #[inline]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
