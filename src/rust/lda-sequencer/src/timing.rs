// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Longest single wait. Longer holds are split so cancellation is noticed in time.
pub const MAX_SLEEP_SEGMENT: Duration = Duration::from_secs(1);

/// A hold that was cut short.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("hold interrupted after {slept:?}, {remaining:?} remaining")]
pub struct Interrupted {
    pub slept: Duration,
    pub remaining: Duration,
}

/// Shared cancellation flag that wakes every sleeping worker.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, condvar) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        condvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits up to `timeout`; returns `false` if cancelled before it elapsed.
    fn wait(&self, timeout: Duration) -> bool {
        let (flag, condvar) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = condvar
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        !*guard
    }
}

/// The blocking primitive used for holds.
pub trait Sleeper: Send + Sync {
    /// Sleeps for at most one segment. On interruption, returns how long was actually slept.
    fn sleep_segment(&self, duration: Duration) -> Result<(), Duration>;
}

/// Sleeps on the calling thread until the duration elapses or the token is cancelled.
#[derive(Debug, Clone, Default)]
pub struct ThreadSleeper {
    token: CancelToken,
}

impl ThreadSleeper {
    pub fn new(token: CancelToken) -> Self {
        Self { token }
    }
}

impl Sleeper for ThreadSleeper {
    fn sleep_segment(&self, duration: Duration) -> Result<(), Duration> {
        let started = Instant::now();
        if self.token.wait(duration) {
            Ok(())
        } else {
            Err(started.elapsed().min(duration))
        }
    }
}

/// Sleeper that returns immediately and records every requested segment.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    segments: Mutex<Vec<Duration>>,
    interrupt_after: Option<usize>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interrupts every segment after the first `segments` ones.
    pub fn interrupting_after(segments: usize) -> Self {
        Self {
            segments: Mutex::new(Vec::new()),
            interrupt_after: Some(segments),
        }
    }

    pub fn segments(&self) -> Vec<Duration> {
        self.segments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Total time that would have been slept.
    pub fn total(&self) -> Duration {
        self.segments().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep_segment(&self, duration: Duration) -> Result<(), Duration> {
        let mut segments = self.segments.lock().unwrap_or_else(PoisonError::into_inner);
        if self.interrupt_after.is_some_and(|limit| segments.len() >= limit) {
            return Err(Duration::ZERO);
        }
        segments.push(duration);
        Ok(())
    }
}

/// Sleeps for `duration` in segments of at most [`MAX_SLEEP_SEGMENT`].
pub fn sleep_for(sleeper: &dyn Sleeper, duration: Duration) -> Result<(), Interrupted> {
    let mut slept = Duration::ZERO;
    while slept < duration {
        let segment = (duration - slept).min(MAX_SLEEP_SEGMENT);
        if let Err(partial) = sleeper.sleep_segment(segment) {
            slept += partial;
            return Err(Interrupted {
                slept,
                remaining: duration - slept,
            });
        }
        slept += segment;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments() {
        let sleeper = RecordingSleeper::new();
        sleep_for(&sleeper, Duration::from_millis(2500)).unwrap();
        assert_eq!(
            sleeper.segments(),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(1),
                Duration::from_millis(500)
            ]
        );
    }

    #[test]
    fn test_zero_duration() {
        let sleeper = RecordingSleeper::new();
        sleep_for(&sleeper, Duration::ZERO).unwrap();
        assert!(sleeper.segments().is_empty());
    }

    #[test]
    fn test_interrupted() {
        let sleeper = RecordingSleeper::interrupting_after(2);
        let err = sleep_for(&sleeper, Duration::from_secs(5)).unwrap_err();
        assert_eq!(err.slept, Duration::from_secs(2));
        assert_eq!(err.remaining, Duration::from_secs(3));
    }

    #[test]
    fn test_cancelled_token_wakes_sleeper() {
        let token = CancelToken::new();
        let sleeper = ThreadSleeper::new(token.clone());
        let handle = std::thread::spawn(move || sleep_for(&sleeper, Duration::from_secs(60)));
        token.cancel();
        let err = handle.join().unwrap().unwrap_err();
        assert!(err.remaining > Duration::from_secs(50));
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_thread_sleeper_short_sleep() {
        let sleeper = ThreadSleeper::default();
        let started = Instant::now();
        sleep_for(&sleeper, Duration::from_millis(5)).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(5));
    }
}
