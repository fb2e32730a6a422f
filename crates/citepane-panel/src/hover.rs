//! Debounced hover trigger
//!
//! A pointer entering a citation schedules a cancellable open task; if
//! the pointer leaves before the dwell delay elapses, the task is
//! aborted with no visible effect and no network call. Once the preview
//! is open, leaving schedules a shorter close delay so a brief pointer
//! excursion does not flicker the preview shut.
//!
//! The trigger owns timing only. Fired transitions are emitted as
//! [`HoverEvent`]s on a channel; the consumer performs the preview
//! fetch and prefetch side effects.

use citepane_document::DocumentId;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

/// Hover timing configuration.
#[derive(Debug, Clone)]
pub struct HoverConfig {
    /// Dwell time before the preview opens.
    pub open_delay: Duration,
    /// Grace period before the open preview closes.
    pub close_delay: Duration,
}

impl HoverConfig {
    /// Default timing: 300ms dwell, 150ms close grace.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a dwell delay.
    #[inline]
    #[must_use]
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    /// With a close grace period.
    #[inline]
    #[must_use]
    pub fn with_close_delay(mut self, delay: Duration) -> Self {
        self.close_delay = delay;
        self
    }
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            open_delay: Duration::from_millis(300),
            close_delay: Duration::from_millis(150),
        }
    }
}

/// A fired hover transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverEvent {
    /// The dwell delay elapsed; the preview for `id` should open.
    Open(DocumentId),
    /// The close grace period elapsed; the preview for `id` should
    /// close.
    Close(DocumentId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Idle,
    Opening(DocumentId),
    Open(DocumentId),
    Closing(DocumentId),
}

#[derive(Debug)]
struct HoverInner {
    config: HoverConfig,
    phase: Mutex<Phase>,
    pending: Mutex<Option<AbortHandle>>,
    events: mpsc::UnboundedSender<HoverEvent>,
}

impl HoverInner {
    fn cancel_pending(&self) {
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
    }
}

/// Debounced open/close controller for one hover preview surface.
#[derive(Debug, Clone)]
pub struct HoverTrigger {
    inner: Arc<HoverInner>,
}

impl HoverTrigger {
    /// Create a trigger and the receiver its fired events arrive on.
    #[must_use]
    pub fn new(config: HoverConfig) -> (Self, mpsc::UnboundedReceiver<HoverEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let trigger = Self {
            inner: Arc::new(HoverInner {
                config,
                phase: Mutex::new(Phase::Idle),
                pending: Mutex::new(None),
                events,
            }),
        };
        (trigger, rx)
    }

    /// The pointer entered the citation for `id`.
    pub fn pointer_enter(&self, id: DocumentId) {
        let mut phase = self.inner.phase.lock();
        match (*phase).clone() {
            // Re-entering within the close grace period keeps the
            // preview open with no events fired.
            Phase::Closing(closing) if closing == id => {
                *phase = Phase::Open(id);
                drop(phase);
                self.inner.cancel_pending();
                return;
            }
            Phase::Open(open) if open == id => return,
            Phase::Opening(opening) if opening == id => return,
            _ => {}
        }
        *phase = Phase::Opening(id.clone());
        drop(phase);
        self.inner.cancel_pending();

        let task_inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(task_inner.config.open_delay).await;
            let mut phase = task_inner.phase.lock();
            if *phase == Phase::Opening(id.clone()) {
                *phase = Phase::Open(id.clone());
                drop(phase);
                tracing::debug!(%id, "hover dwell elapsed, opening preview");
                let _ = task_inner.events.send(HoverEvent::Open(id));
            }
        });
        *self.inner.pending.lock() = Some(handle.abort_handle());
    }

    /// The pointer left the citation.
    pub fn pointer_leave(&self) {
        let mut phase = self.inner.phase.lock();
        match (*phase).clone() {
            Phase::Opening(id) => {
                // Left before the dwell elapsed: cancel silently.
                *phase = Phase::Idle;
                drop(phase);
                self.inner.cancel_pending();
                tracing::debug!(%id, "hover cancelled before dwell elapsed");
            }
            Phase::Open(id) => {
                *phase = Phase::Closing(id.clone());
                drop(phase);
                self.inner.cancel_pending();

                let task_inner = Arc::clone(&self.inner);
                let handle = tokio::spawn(async move {
                    tokio::time::sleep(task_inner.config.close_delay).await;
                    let mut phase = task_inner.phase.lock();
                    if *phase == Phase::Closing(id.clone()) {
                        *phase = Phase::Idle;
                        drop(phase);
                        let _ = task_inner.events.send(HoverEvent::Close(id));
                    }
                });
                *self.inner.pending.lock() = Some(handle.abort_handle());
            }
            Phase::Closing(_) | Phase::Idle => {}
        }
    }

    /// Whether the preview is currently open (or closing within its
    /// grace period).
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(
            &*self.inner.phase.lock(),
            Phase::Open(_) | Phase::Closing(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger() -> (HoverTrigger, mpsc::UnboundedReceiver<HoverEvent>) {
        HoverTrigger::new(HoverConfig::default())
    }

    async fn settle() {
        // Let spawned timer tasks register their sleeps before the
        // paused clock moves, and run their continuations after it has.
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dwell_fires_open_event() {
        let (trigger, mut rx) = trigger();
        trigger.pointer_enter(DocumentId::new("d1"));
        settle().await;

        tokio::time::advance(Duration::from_millis(300)).await;
        settle().await;

        assert_eq!(rx.try_recv().unwrap(), HoverEvent::Open(DocumentId::new("d1")));
        assert!(trigger.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn leaving_before_dwell_cancels_silently() {
        let (trigger, mut rx) = trigger();
        trigger.pointer_enter(DocumentId::new("d1"));
        settle().await;

        tokio::time::advance(Duration::from_millis(299)).await;
        trigger.pointer_leave();

        tokio::time::advance(Duration::from_millis(300)).await;
        settle().await;

        assert!(rx.try_recv().is_err());
        assert!(!trigger.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn leave_after_open_closes_after_grace_period() {
        let (trigger, mut rx) = trigger();
        trigger.pointer_enter(DocumentId::new("d1"));
        settle().await;
        tokio::time::advance(Duration::from_millis(300)).await;
        settle().await;
        let _ = rx.try_recv();

        trigger.pointer_leave();
        settle().await;
        tokio::time::advance(Duration::from_millis(150)).await;
        settle().await;

        assert_eq!(rx.try_recv().unwrap(), HoverEvent::Close(DocumentId::new("d1")));
        assert!(!trigger.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn reentry_within_grace_period_prevents_flicker() {
        let (trigger, mut rx) = trigger();
        trigger.pointer_enter(DocumentId::new("d1"));
        settle().await;
        tokio::time::advance(Duration::from_millis(300)).await;
        settle().await;
        let _ = rx.try_recv();

        trigger.pointer_leave();
        settle().await;
        tokio::time::advance(Duration::from_millis(100)).await;
        trigger.pointer_enter(DocumentId::new("d1"));

        tokio::time::advance(Duration::from_millis(500)).await;
        settle().await;

        // No close fired, and no duplicate open either.
        assert!(rx.try_recv().is_err());
        assert!(trigger.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_enter_leave_enter_fires_one_open() {
        let (trigger, mut rx) = trigger();
        trigger.pointer_enter(DocumentId::new("d1"));
        settle().await;
        tokio::time::advance(Duration::from_millis(100)).await;
        trigger.pointer_leave();
        trigger.pointer_enter(DocumentId::new("d1"));
        settle().await;

        tokio::time::advance(Duration::from_millis(300)).await;
        settle().await;

        assert_eq!(rx.try_recv().unwrap(), HoverEvent::Open(DocumentId::new("d1")));
        assert!(rx.try_recv().is_err());
    }
}
