//! In-flight request accounting
//!
//! A process-wide counter of calls between "starting" and "finished". The
//! counter starts at 0 and never goes negative. An optional global activity
//! channel mirrors it and announces batch boundaries:
//!
//! ```text
//! 0 -> 1   ActivityEvent::Start
//! 1 -> 0   ActivityEvent::Stop
//! ```
//!
//! Calls hold a [`RequestGuard`] for the whole transport attempt, so every
//! start is matched by exactly one finish on every exit path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use tokio::sync::broadcast;

/// Channel capacity; listeners only care about the latest transitions
const ACTIVITY_CAPACITY: usize = 16;

static GLOBAL: Lazy<Arc<RequestAccounting>> =
    Lazy::new(|| Arc::new(RequestAccounting::with_activity(ActivityBroadcast::new())));

/// Batch boundary announced by [`ActivityBroadcast`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityEvent {
    /// First call of a batch started
    Start,
    /// Last outstanding call finished
    Stop,
}

/// Global active-request counter with start/stop events
#[derive(Clone)]
pub struct ActivityBroadcast {
    active: Arc<AtomicUsize>,
    tx: broadcast::Sender<ActivityEvent>,
}

impl ActivityBroadcast {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(ACTIVITY_CAPACITY);
        Self {
            active: Arc::new(AtomicUsize::new(0)),
            tx,
        }
    }

    /// Subscribe to batch start/stop events
    pub fn subscribe(&self) -> broadcast::Receiver<ActivityEvent> {
        self.tx.subscribe()
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    fn increment(&self) {
        if self.active.fetch_add(1, Ordering::SeqCst) == 0 {
            self.emit(ActivityEvent::Start);
        }
    }

    fn decrement(&self) {
        if let Ok(1) = self
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        {
            self.emit(ActivityEvent::Stop);
        }
    }

    fn emit(&self, event: ActivityEvent) {
        // No subscribers is fine
        let _ = self.tx.send(event);
        tracing::trace!(?event, "Request batch boundary");
    }
}

impl Default for ActivityBroadcast {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter of in-flight calls
#[derive(Default)]
pub struct RequestAccounting {
    active: AtomicUsize,
    activity: Option<ActivityBroadcast>,
}

impl RequestAccounting {
    /// Counter without a global activity channel
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter mirrored into `activity`
    pub fn with_activity(activity: ActivityBroadcast) -> Self {
        Self {
            active: AtomicUsize::new(0),
            activity: Some(activity),
        }
    }

    /// The process-wide counter
    pub fn global() -> Arc<RequestAccounting> {
        Arc::clone(&GLOBAL)
    }

    pub fn activity(&self) -> Option<&ActivityBroadcast> {
        self.activity.as_ref()
    }

    pub fn request_starting(&self) {
        if let Some(activity) = &self.activity {
            activity.increment();
        }
        self.active.fetch_add(1, Ordering::SeqCst);
    }

    pub fn request_finished(&self) {
        if let Some(activity) = &self.activity {
            activity.decrement();
        }
        if self
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_err()
        {
            tracing::warn!("request_finished called with no active requests");
        }
    }

    pub fn active_requests(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Count a request until the returned guard is dropped
    pub fn start(self: &Arc<Self>) -> RequestGuard {
        self.request_starting();
        RequestGuard {
            accounting: Arc::clone(self),
        }
    }
}

/// Finishes its request on drop
pub struct RequestGuard {
    accounting: Arc<RequestAccounting>,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.accounting.request_finished();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_calls_return_to_zero() {
        let accounting = RequestAccounting::new();
        for n in [0usize, 1, 5, 50] {
            for _ in 0..n {
                accounting.request_starting();
            }
            assert_eq!(accounting.active_requests(), n);
            for _ in 0..n {
                accounting.request_finished();
            }
            assert_eq!(accounting.active_requests(), 0);
        }
    }

    #[test]
    fn test_never_negative() {
        let accounting = RequestAccounting::new();
        accounting.request_finished();
        assert_eq!(accounting.active_requests(), 0);
    }

    #[test]
    fn test_guard_releases_on_panic() {
        let accounting = Arc::new(RequestAccounting::new());
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = accounting.start();
            assert_eq!(accounting.active_requests(), 1);
            panic!("transport blew up");
        }));
        assert!(result.is_err());
        assert_eq!(accounting.active_requests(), 0);
    }

    #[test]
    fn test_activity_events_on_transitions_only() {
        let activity = ActivityBroadcast::new();
        let mut rx = activity.subscribe();
        let accounting = Arc::new(RequestAccounting::with_activity(activity.clone()));

        let first = accounting.start();
        let second = accounting.start();
        assert_eq!(activity.active(), 2);
        drop(first);
        drop(second);
        assert_eq!(activity.active(), 0);

        assert_eq!(rx.try_recv().unwrap(), ActivityEvent::Start);
        assert_eq!(rx.try_recv().unwrap(), ActivityEvent::Stop);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_shared_activity_counts_across_clients() {
        let activity = ActivityBroadcast::new();
        let a = Arc::new(RequestAccounting::with_activity(activity.clone()));
        let b = Arc::new(RequestAccounting::with_activity(activity.clone()));

        let ga = a.start();
        let gb = b.start();
        assert_eq!(activity.active(), 2);
        assert_eq!(a.active_requests(), 1);
        drop(ga);
        drop(gb);
        assert_eq!(activity.active(), 0);
    }

    #[test]
    fn test_global_is_shared() {
        let a = RequestAccounting::global();
        let b = RequestAccounting::global();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.activity().is_some());
    }
}
