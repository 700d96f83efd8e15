//! Sliding-window rate counters.
//!
//! A [`RateCounter`] counts the messages sent during the current window of
//! one rate-limit category. Every increment is paired with a decrement that
//! fires once the window has elapsed, so the value is always the number of
//! sends within the last window. Counters are owned by the lane that uses
//! them and shared with their pending decrements through an `Arc`.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Mutex-guarded count of messages in the current window.
#[derive(Debug, Default)]
pub struct RateCounter {
    value: Mutex<usize>,
}

impl RateCounter {
    /// Create a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one and return the new value.
    pub fn increment(&self) -> usize {
        let mut value = self.value.lock();
        *value += 1;
        *value
    }

    /// Subtract one, never going below zero, and return the new value.
    pub fn decrement(&self) -> usize {
        let mut value = self.value.lock();
        *value = value.saturating_sub(1);
        *value
    }

    /// Current value.
    pub fn snapshot(&self) -> usize {
        *self.value.lock()
    }
}

/// Maximum number of messages per window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quota {
    pub limit: usize,
    pub window: Duration,
}

impl Quota {
    pub const fn new(limit: usize, window: Duration) -> Self {
        Self { limit, window }
    }

    pub const fn per_second(limit: usize) -> Self {
        Self::new(limit, Duration::from_secs(1))
    }

    pub const fn per_minute(limit: usize) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }
}

/// A quota together with the counter that tracks it.
#[derive(Debug, Clone)]
pub struct Window {
    quota: Quota,
    counter: Arc<RateCounter>,
}

impl Window {
    pub fn new(quota: Quota) -> Self {
        Self {
            quota,
            counter: Arc::new(RateCounter::new()),
        }
    }

    pub fn quota(&self) -> Quota {
        self.quota
    }

    pub fn counter(&self) -> &Arc<RateCounter> {
        &self.counter
    }

    /// Count one send and schedule its expiry after the window duration.
    ///
    /// Returns the post-increment count. The scheduled decrement fires
    /// whether or not the send succeeds; cancelling `cancel` drops it.
    pub fn record(&self, cancel: &CancellationToken) -> usize {
        let count = self.counter.increment();

        let counter = Arc::clone(&self.counter);
        let window = self.quota.window;
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(window) => {
                    counter.decrement();
                }
                _ = cancel.cancelled() => {}
            }
        });

        count
    }

    /// Whether a post-increment `count` requires the lane to stall.
    pub fn is_exhausted(&self, count: usize) -> bool {
        count >= self.quota.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_basic() {
        let counter = RateCounter::new();
        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.increment(), 2);
        assert_eq!(counter.decrement(), 1);
        assert_eq!(counter.snapshot(), 1);
    }

    #[test]
    fn test_counter_never_negative() {
        let counter = RateCounter::new();
        assert_eq!(counter.decrement(), 0);
        assert_eq!(counter.decrement(), 0);
        assert_eq!(counter.snapshot(), 0);
    }

    #[test]
    fn test_counter_concurrent_interleaving() {
        let counter = Arc::new(RateCounter::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let counter = Arc::clone(&counter);
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    if i % 2 == 0 {
                        counter.increment();
                    } else {
                        counter.decrement();
                    }
                    // an underflow would wrap to a huge value
                    assert!(counter.snapshot() <= 4 * 1000);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(counter.snapshot() <= 4 * 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_expires_after_duration() {
        let cancel = CancellationToken::new();
        let window = Window::new(Quota::new(2, Duration::from_secs(10)));

        assert_eq!(window.record(&cancel), 1);
        assert!(!window.is_exhausted(1));
        assert_eq!(window.record(&cancel), 2);
        assert!(window.is_exhausted(2));

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(window.counter().snapshot(), 2);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(window.counter().snapshot(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_cancel_drops_pending_decrements() {
        let cancel = CancellationToken::new();
        let window = Window::new(Quota::per_second(5));
        window.record(&cancel);
        cancel.cancel();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(window.counter().snapshot(), 1);
    }
}
