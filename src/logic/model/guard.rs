//! Scorer call guard
//!
//! Runs a scorer call on a helper thread and waits at most `timeout`.
//! A late result is discarded; a panic inside the scorer surfaces as an
//! inference error.
//!
//! Each guard caps the number of outstanding calls. A timed-out call keeps
//! its slot until the scorer actually returns; once every slot is held by a
//! hung call, further calls fail fast with `Unavailable` instead of starting
//! more threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::scorer::ScorerError;

#[derive(Debug)]
pub struct CallGuard {
    in_flight: Arc<AtomicUsize>,
    limit: usize,
}

/// Frees a slot when the helper thread is done (or unwinds)
struct Slot(Arc<AtomicUsize>);

impl Drop for Slot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl CallGuard {
    /// At most `limit` (min 1) calls outstanding at once
    pub fn new(limit: usize) -> Self {
        Self {
            in_flight: Arc::new(AtomicUsize::new(0)),
            limit: limit.max(1),
        }
    }

    /// Calls that have not returned yet, including timed-out ones
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn call<T, F>(&self, timeout: Duration, call: F) -> Result<T, ScorerError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, ScorerError> + Send + 'static,
    {
        let limit = self.limit;
        if self
            .in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < limit).then(|| n + 1))
            .is_err()
        {
            return Err(ScorerError::Unavailable(format!(
                "{} earlier calls still running",
                limit
            )));
        }
        let slot = Slot(Arc::clone(&self.in_flight));

        let (tx, rx) = mpsc::channel();

        // On spawn failure the closure (and `slot`) is dropped here
        thread::Builder::new()
            .name("scorer-call".to_string())
            .spawn(move || {
                let result = call();
                // Free the slot before the caller can observe the result
                drop(slot);
                // Receiver may be gone after a timeout
                let _ = tx.send(result);
            })
            .map_err(|e| ScorerError::Inference(format!("Failed to spawn scorer thread: {}", e)))?;

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(ScorerError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                Err(ScorerError::Inference("scorer panicked".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[test]
    fn test_fast_call_returns_value() {
        let guard = CallGuard::new(1);
        let result = guard.call(Duration::from_secs(1), || Ok(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_slow_call_times_out() {
        let guard = CallGuard::new(1);
        let result: Result<(), _> = guard.call(Duration::from_millis(20), || {
            thread::sleep(Duration::from_millis(500));
            Ok(())
        });
        assert!(matches!(result, Err(ScorerError::Timeout(_))));
    }

    #[test]
    fn test_panicking_call_is_an_error() {
        let guard = CallGuard::new(1);
        let result: Result<(), _> = guard.call(Duration::from_secs(1), || panic!("boom"));
        assert!(matches!(result, Err(ScorerError::Inference(_))));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(guard.in_flight(), 0);
    }

    #[test]
    fn test_hung_call_blocks_new_threads() {
        let guard = CallGuard::new(1);
        let started = Arc::new(AtomicUsize::new(0));

        for _ in 0..20 {
            let started = Arc::clone(&started);
            let _: Result<(), _> = guard.call(Duration::from_millis(5), move || {
                started.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(400));
                Ok(())
            });
        }

        thread::sleep(Duration::from_millis(50));
        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(guard.in_flight(), 1);
        let result: Result<(), _> = guard.call(Duration::from_millis(5), || Ok(()));
        assert!(matches!(result, Err(ScorerError::Unavailable(_))));
    }

    #[test]
    fn test_limit_bounds_hung_calls() {
        let guard = CallGuard::new(3);
        let started = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let started = Arc::clone(&started);
            let _: Result<(), _> = guard.call(Duration::from_millis(5), move || {
                started.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(400));
                Ok(())
            });
        }

        thread::sleep(Duration::from_millis(50));
        assert_eq!(started.load(Ordering::SeqCst), 3);
        assert_eq!(guard.in_flight(), 3);
    }

    #[test]
    fn test_back_to_back_calls_share_one_slot() {
        let guard = CallGuard::new(1);
        for i in 0..20 {
            assert_eq!(guard.call(Duration::from_secs(1), move || Ok(i)).unwrap(), i);
        }
    }

    #[test]
    fn test_guard_reopens_after_late_call_finishes() {
        let guard = CallGuard::new(1);
        let _: Result<(), _> = guard.call(Duration::from_millis(5), || {
            thread::sleep(Duration::from_millis(100));
            Ok(())
        });

        thread::sleep(Duration::from_millis(400));
        assert_eq!(guard.call(Duration::from_secs(1), || Ok(7)).unwrap(), 7);
    }
}
