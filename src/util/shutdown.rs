use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Granularity at which sleeps check for shutdown.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Cancellation signal shared between the signal handler and the polling loop.
///
/// Until the polling loop marks the graceful phase, nothing observes the
/// signal while blocked, so an interrupt handler should exit instead.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
    graceful: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Marks the start of the phase that polls for shutdown.
    pub fn begin_graceful(&self) {
        self.graceful.store(true, Ordering::SeqCst);
    }

    pub fn is_graceful(&self) -> bool {
        self.graceful.load(Ordering::SeqCst)
    }

    /// Sleeps for `duration` in short slices, returning early on shutdown.
    ///
    /// Returns `false` if shutdown was requested before the full duration elapsed.
    pub fn sleep(&self, duration: Duration) -> bool {
        let mut remaining = duration;
        while remaining > Duration::ZERO {
            if self.is_requested() {
                return false;
            }
            let slice = remaining.min(SLEEP_SLICE);
            std::thread::sleep(slice);
            remaining = remaining.saturating_sub(slice);
        }
        !self.is_requested()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn sleep_runs_to_completion() {
        let shutdown = Shutdown::new();
        assert!(shutdown.sleep(Duration::from_millis(10)));
    }

    #[test]
    fn requested_shutdown_cuts_sleep_short() {
        let shutdown = Shutdown::new();
        let handle = shutdown.clone();
        let waker = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            handle.request();
        });

        let start = Instant::now();
        assert!(!shutdown.sleep(Duration::from_secs(30)));
        assert!(start.elapsed() < Duration::from_secs(5));
        waker.join().unwrap();
    }

    #[test]
    fn graceful_phase_is_shared_between_clones() {
        let shutdown = Shutdown::new();
        let handle = shutdown.clone();
        assert!(!handle.is_graceful());
        shutdown.begin_graceful();
        assert!(handle.is_graceful());
    }

    #[test]
    fn zero_sleep_reports_pending_shutdown() {
        let shutdown = Shutdown::new();
        assert!(shutdown.sleep(Duration::ZERO));
        shutdown.request();
        assert!(!shutdown.sleep(Duration::ZERO));
    }
}
