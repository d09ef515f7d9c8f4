//! Application smoke test.
//!
//! A non-responding application is reported as a warning, never as a
//! failure of the run.

use stackup_common::config::RetryPolicy;
use stackup_common::error::{Result, StackupError};
use stackup_runtime::http::{HttpProbe, is_success};
use stackup_runtime::probe::{Pause, ProbeOutcome, poll_until};

use crate::console::Console;
use crate::state::SmokeOutcome;

/// Requests `url` until a 2xx arrives or the attempt budget is spent.
///
/// # Errors
///
/// Returns an error only if the run is interrupted.
pub fn verify_serving(
    url: &str,
    policy: RetryPolicy,
    http: &dyn HttpProbe,
    pause: &dyn Pause,
    console: &Console,
) -> Result<SmokeOutcome> {
    console.info("Testing application...");
    let outcome = poll_until(policy, pause, |attempt| {
        let result = http.get_status(url).and_then(|status| {
            tracing::debug!(attempt, status, url, "smoke response");
            if is_success(status) {
                Ok(())
            } else {
                Err(StackupError::Http {
                    url: url.to_string(),
                    message: format!("status {status}"),
                })
            }
        });
        if result.is_err() {
            console.info(format!(
                "Application not ready yet (attempt {attempt}/{})...",
                policy.max_attempts
            ));
        }
        result
    })?;

    Ok(match outcome {
        ProbeOutcome::Ready { attempts } => {
            console.success("Application is responding");
            SmokeOutcome::Responding { attempts }
        }
        ProbeOutcome::Exhausted {
            attempts,
            last_error,
        } => {
            tracing::warn!(attempts, last_error = ?last_error, "application not responding");
            console.warning("Application might not be fully ready yet");
            SmokeOutcome::NotResponding {
                attempts,
                last_error,
            }
        }
    })
}
