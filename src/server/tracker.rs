// Connection tracking module
// Counts open connections and tunnels, and broadcasts shutdown to them

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Shared by the accept loop, every connection task and every tunnel
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    active: Arc<AtomicUsize>,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            active: Arc::new(AtomicUsize::new(0)),
            stop_tx: Arc::new(tx),
            stop_rx: rx,
        }
    }

    /// Count a new connection unless `max` are already open
    pub fn try_track(&self, max: Option<u64>) -> Option<ConnectionGuard> {
        // Increment first, then check, so concurrent accepts cannot overshoot
        let prev = self.active.fetch_add(1, Ordering::SeqCst);
        let guard = ConnectionGuard(Arc::clone(&self.active));
        let limit = max.map_or(usize::MAX, |m| usize::try_from(m).unwrap_or(usize::MAX));
        (prev < limit).then_some(guard)
    }

    /// Count unconditionally; a tunnel takes over the slot of the
    /// connection it was upgraded from
    pub fn track(&self) -> ConnectionGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard(Arc::clone(&self.active))
    }

    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Resolves `changed()` once shutdown begins
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.stop_rx.clone()
    }

    pub fn begin_shutdown(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.stop_rx.borrow()
    }

    /// Wait for every tracked connection to close; `false` if `grace` ran out
    pub async fn drain(&self, grace: Duration) -> bool {
        tokio::time::timeout(grace, async {
            while self.active_count() > 0 {
                tokio::time::sleep(DRAIN_POLL).await;
            }
        })
        .await
        .is_ok()
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the open count when dropped, even on panic
#[derive(Debug)]
pub struct ConnectionGuard(Arc<AtomicUsize>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_and_release() {
        let tracker = ConnectionTracker::new();
        let first = tracker.try_track(Some(1)).unwrap();
        assert!(tracker.try_track(Some(1)).is_none());
        assert_eq!(tracker.active_count(), 1);

        let tunnel = tracker.track();
        drop(first);
        assert_eq!(tracker.active_count(), 1);
        assert!(tracker.try_track(Some(1)).is_none());

        drop(tunnel);
        assert_eq!(tracker.active_count(), 0);
        assert!(tracker.try_track(None).is_some());
    }

    #[tokio::test]
    async fn test_shutdown_reaches_receivers() {
        let tracker = ConnectionTracker::new();
        let mut rx = tracker.shutdown_receiver();
        assert!(!tracker.is_shutting_down());
        tracker.begin_shutdown();
        rx.changed().await.unwrap();
        assert!(*rx.borrow());

        // Receivers taken after the fact still see the change
        let mut late = tracker.shutdown_receiver();
        assert!(late.changed().await.is_ok());
    }

    #[tokio::test]
    async fn test_drain() {
        let tracker = ConnectionTracker::new();
        assert!(tracker.drain(Duration::from_millis(10)).await);

        let guard = tracker.track();
        assert!(!tracker.drain(Duration::from_millis(100)).await);

        let release = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            drop(guard);
        });
        assert!(tracker.drain(Duration::from_secs(5)).await);
        release.await.unwrap();
    }
}
