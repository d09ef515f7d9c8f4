//! Bounded linear retry.
//!
//! One primitive serves both the database readiness wait and the smoke
//! test: call a probe up to `max_attempts` times with a constant pause in
//! between, and stop at the first success.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use stackup_common::config::RetryPolicy;
use stackup_common::error::{Result, StackupError};

/// Slice length for interruptible sleeps.
const PAUSE_SLICE: Duration = Duration::from_millis(250);

/// Suspends the run between probe attempts.
pub trait Pause: Send + Sync {
    /// Waits for `duration`.
    ///
    /// # Errors
    ///
    /// Returns [`StackupError::Interrupted`] if the run was cancelled
    /// while waiting.
    fn pause(&self, duration: Duration) -> Result<()>;

    /// Reports whether the run has been cancelled, without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`StackupError::Interrupted`] once cancellation was requested.
    fn check(&self) -> Result<()> {
        Ok(())
    }
}

/// Sleeps the current thread, waking early when the cancel flag is raised.
#[derive(Debug, Clone, Default)]
pub struct ThreadPause {
    cancel: Option<Arc<AtomicBool>>,
}

impl ThreadPause {
    /// Creates a pause that cannot be interrupted.
    #[must_use]
    pub const fn new() -> Self {
        Self { cancel: None }
    }

    /// Creates a pause that aborts once `cancel` becomes `true`.
    #[must_use]
    pub const fn interruptible(cancel: Arc<AtomicBool>) -> Self {
        Self {
            cancel: Some(cancel),
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|c| c.load(Ordering::SeqCst))
    }
}

impl Pause for ThreadPause {
    fn check(&self) -> Result<()> {
        if self.cancelled() {
            Err(StackupError::Interrupted)
        } else {
            Ok(())
        }
    }

    fn pause(&self, duration: Duration) -> Result<()> {
        let deadline = Instant::now() + duration;
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep(PAUSE_SLICE.min(deadline - now));
        }
    }
}

/// Result of polling a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The probe succeeded on attempt `attempts`.
    Ready {
        /// Attempts used, including the successful one.
        attempts: u32,
    },
    /// Every attempt failed.
    Exhausted {
        /// Attempts performed.
        attempts: u32,
        /// Failure reported by the final attempt.
        last_error: Option<String>,
    },
}

/// Calls `probe` until it succeeds or `policy.max_attempts` is reached.
///
/// The probe receives the 1-indexed attempt number. Any error it returns
/// counts as a failed attempt, except [`StackupError::Interrupted`], which
/// ends polling immediately. The pause runs only between attempts.
///
/// # Errors
///
/// Returns an error only if the run is interrupted.
pub fn poll_until<F>(policy: RetryPolicy, pause: &dyn Pause, mut probe: F) -> Result<ProbeOutcome>
where
    F: FnMut(u32) -> Result<()>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        match probe(attempt) {
            Ok(()) => return Ok(ProbeOutcome::Ready { attempts: attempt }),
            Err(StackupError::Interrupted) => return Err(StackupError::Interrupted),
            Err(e) => {
                tracing::debug!(attempt, max_attempts, error = %e, "probe attempt failed");
                last_error = Some(e.to_string());
            }
        }
        if attempt < max_attempts {
            pause.pause(policy.interval())?;
        }
    }

    Ok(ProbeOutcome::Exhausted {
        attempts: max_attempts,
        last_error,
    })
}

/// Like [`poll_until`], but exhaustion is an error.
///
/// Returns the number of attempts used.
///
/// # Errors
///
/// Returns [`StackupError::Timeout`] naming `what` if every attempt fails,
/// or [`StackupError::Interrupted`] if the run is cancelled.
pub fn wait_until_ready<F>(what: &str, policy: RetryPolicy, pause: &dyn Pause, probe: F) -> Result<u32>
where
    F: FnMut(u32) -> Result<()>,
{
    match poll_until(policy, pause, probe)? {
        ProbeOutcome::Ready { attempts } => Ok(attempts),
        ProbeOutcome::Exhausted { attempts, .. } => Err(StackupError::Timeout {
            what: what.to_string(),
            attempts,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::RecordingPause;

    fn failing() -> StackupError {
        StackupError::Config {
            message: "not yet".into(),
        }
    }

    #[test]
    fn always_failing_probe_uses_every_attempt() {
        let pause = RecordingPause::new();
        let mut calls = Vec::new();
        let err = wait_until_ready("database", RetryPolicy::new(5, 2), &pause, |n| {
            calls.push(n);
            Err(failing())
        })
        .expect_err("timeout");

        assert!(matches!(err, StackupError::Timeout { attempts: 5, .. }));
        assert_eq!(calls, vec![1, 2, 3, 4, 5]);
        assert_eq!(pause.pauses(), vec![Duration::from_secs(2); 4]);
    }

    #[test]
    fn succeeds_after_k_failures() {
        let pause = RecordingPause::new();
        let mut calls = 0;
        let attempts = wait_until_ready("database", RetryPolicy::new(10, 1), &pause, |_| {
            calls += 1;
            if calls <= 3 { Err(failing()) } else { Ok(()) }
        })
        .expect("ready");

        assert_eq!(attempts, 4);
        assert_eq!(calls, 4);
        assert_eq!(pause.pauses().len(), 3);
    }

    #[test]
    fn first_success_needs_no_pause() {
        let pause = RecordingPause::new();
        let outcome = poll_until(RetryPolicy::new(3, 9), &pause, |_| Ok(())).expect("poll");
        assert_eq!(outcome, ProbeOutcome::Ready { attempts: 1 });
        assert!(pause.pauses().is_empty());
    }

    #[test]
    fn exhaustion_keeps_last_error() {
        let pause = RecordingPause::new();
        let outcome = poll_until(RetryPolicy::new(2, 0), &pause, |n| {
            Err(StackupError::Http {
                url: "http://x/".into(),
                message: format!("refused {n}"),
            })
        })
        .expect("poll");
        match outcome {
            ProbeOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 2);
                assert!(last_error.expect("error").contains("refused 2"));
            }
            ProbeOutcome::Ready { .. } => panic!("should not be ready"),
        }
    }

    #[test]
    fn interruption_stops_polling() {
        let pause = RecordingPause::new().interrupt_after(1);
        let mut calls = 0;
        let err = poll_until(RetryPolicy::new(10, 1), &pause, |_| {
            calls += 1;
            Err(failing())
        })
        .expect_err("interrupted");
        assert!(matches!(err, StackupError::Interrupted));
        assert_eq!(calls, 2);
    }

    #[test]
    fn thread_pause_honours_cancel_flag() {
        let flag = Arc::new(AtomicBool::new(true));
        let pause = ThreadPause::interruptible(flag);
        let started = Instant::now();
        assert!(matches!(
            pause.pause(Duration::from_secs(30)),
            Err(StackupError::Interrupted)
        ));
        assert!(started.elapsed() < Duration::from_secs(1));
        ThreadPause::new()
            .pause(Duration::from_millis(1))
            .expect("short pause");
    }

    #[test]
    fn thread_pause_check_follows_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let pause = ThreadPause::interruptible(Arc::clone(&flag));
        pause.check().expect("not cancelled yet");
        flag.store(true, Ordering::SeqCst);
        assert!(matches!(pause.check(), Err(StackupError::Interrupted)));
        ThreadPause::new().check().expect("never cancelled");
    }
}
