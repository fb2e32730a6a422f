//! Panel navigation state machine
//!
//! Owns which document the slideout panel displays, whether it is
//! pinned, and browser-style back/forward history. The machine holds
//! identifiers only; payloads are always re-read through the cache.
//!
//! Pinned panels resist ambient close triggers (clicking outside); an
//! explicit close unpins first. Navigating to the document already on
//! screen leaves history untouched but still bumps a monotonically
//! increasing navigation counter, so a viewer can re-run its
//! scroll-to-source logic on repeat clicks of the same citation.

use citepane_document::DocumentId;

/// Snapshot of the panel's navigation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelState {
    /// Whether the panel is visible.
    pub is_open: bool,
    /// Whether the panel resists ambient close triggers.
    pub is_pinned: bool,
    /// Document currently displayed.
    pub current: Option<DocumentId>,
    /// Visited documents, oldest first.
    pub history: Vec<DocumentId>,
    /// Position in `history`; `None` iff `history` is empty.
    pub history_index: Option<usize>,
}

impl PanelState {
    fn closed() -> Self {
        Self {
            is_open: false,
            is_pinned: false,
            current: None,
            history: Vec::new(),
            history_index: None,
        }
    }
}

/// The panel navigation state machine. Long-lived for the session; no
/// terminal state.
#[derive(Debug)]
pub struct PanelNavigator {
    state: PanelState,
    navigation_counter: u64,
}

impl PanelNavigator {
    /// Closed panel with empty history.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: PanelState::closed(),
            navigation_counter: 0,
        }
    }

    /// Current state snapshot.
    #[inline]
    #[must_use]
    pub fn state(&self) -> &PanelState {
        &self.state
    }

    /// Monotonically increasing counter bumped on every `open_panel` /
    /// `navigate_to` call, including same-document re-navigation.
    #[inline]
    #[must_use]
    pub fn navigation_counter(&self) -> u64 {
        self.navigation_counter
    }

    /// Document currently displayed.
    #[inline]
    #[must_use]
    pub fn current(&self) -> Option<&DocumentId> {
        self.state.current.as_ref()
    }

    /// Whether the panel is visible.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.is_open
    }

    /// Whether the panel is pinned.
    #[inline]
    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.state.is_pinned
    }

    /// Open the panel on `id`. Pin state is preserved; a pinned panel
    /// stays pinned. History follows truncate-then-append semantics,
    /// except that re-opening the current document mutates nothing.
    pub fn open_panel(&mut self, id: DocumentId) {
        self.state.is_open = true;
        self.navigate_internal(id);
    }

    /// Navigate the open panel to `id` (e.g. following a citation
    /// inside the displayed document). Same history semantics as
    /// [`Self::open_panel`].
    pub fn navigate_to(&mut self, id: DocumentId) {
        self.navigate_internal(id);
    }

    fn navigate_internal(&mut self, id: DocumentId) {
        if self.state.current.as_ref() != Some(&id) {
            // Drop the forward portion before appending.
            let keep = self.state.history_index.map_or(0, |i| i + 1);
            self.state.history.truncate(keep);
            self.state.history.push(id.clone());
            self.state.history_index = Some(self.state.history.len() - 1);
            self.state.current = Some(id);
        }
        // Bumped even for same-document navigation so viewers re-run
        // their scroll/highlight pass.
        self.navigation_counter += 1;
        tracing::debug!(
            current = ?self.state.current,
            counter = self.navigation_counter,
            "panel navigation"
        );
    }

    /// Ambient close (clicking outside, pressing escape). A no-op while
    /// pinned. The current document and history survive for reopening.
    pub fn close_panel(&mut self) {
        if self.state.is_pinned {
            tracing::debug!("ambient close ignored: panel is pinned");
            return;
        }
        self.state.is_open = false;
    }

    /// Explicit close (the panel's own close button): unpins first,
    /// then closes.
    pub fn force_close(&mut self) {
        self.state.is_pinned = false;
        self.state.is_open = false;
    }

    /// Flip the pin without touching visibility or history.
    pub fn toggle_pin(&mut self) {
        self.state.is_pinned = !self.state.is_pinned;
    }

    /// Whether a back step is possible.
    #[inline]
    #[must_use]
    pub fn can_go_back(&self) -> bool {
        self.state.history_index.is_some_and(|i| i > 0)
    }

    /// Whether a forward step is possible.
    #[inline]
    #[must_use]
    pub fn can_go_forward(&self) -> bool {
        self.state
            .history_index
            .is_some_and(|i| i + 1 < self.state.history.len())
    }

    /// Step back in history. A no-op at the oldest entry. Never
    /// mutates the history list.
    pub fn go_back(&mut self) {
        if let Some(index) = self.state.history_index {
            if index > 0 {
                self.state.history_index = Some(index - 1);
                self.state.current = Some(self.state.history[index - 1].clone());
            }
        }
    }

    /// Step forward in history. A no-op at the newest entry. Never
    /// mutates the history list.
    pub fn go_forward(&mut self) {
        if let Some(index) = self.state.history_index {
            if index + 1 < self.state.history.len() {
                self.state.history_index = Some(index + 1);
                self.state.current = Some(self.state.history[index + 1].clone());
            }
        }
    }
}

impl Default for PanelNavigator {
    fn default() -> Self {
        Self::new()
    }
}
