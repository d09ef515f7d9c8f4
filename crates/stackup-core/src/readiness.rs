//! Database readiness wait.

use stackup_common::config::RetryPolicy;
use stackup_common::error::{Result, StackupError};
use stackup_runtime::compose::Compose;
use stackup_runtime::probe::{Pause, wait_until_ready};
use stackup_runtime::runner::CommandRunner;

use crate::console::Console;

/// Runs `probe` inside `service` until it exits zero.
///
/// Returns the attempts used.
///
/// # Errors
///
/// Returns [`StackupError::Timeout`] once the attempt budget is spent.
pub fn wait_for_database(
    compose: &Compose,
    service: &str,
    probe: &[String],
    policy: RetryPolicy,
    runner: &dyn CommandRunner,
    pause: &dyn Pause,
    console: &Console,
) -> Result<u32> {
    console.info("Waiting for database to be ready...");
    let invocation = compose.exec(service, probe, &[]);

    let result = wait_until_ready("database", policy, pause, |attempt| {
        tracing::info!(attempt, max_attempts = policy.max_attempts, service, "probing database");
        let out = runner.run(&invocation)?;
        if out.success() {
            return Ok(());
        }
        console.info(format!(
            "Database not ready yet (attempt {attempt}/{})...",
            policy.max_attempts
        ));
        Err(StackupError::CommandFailed {
            command: invocation.command_line(),
            code: out.exit_code,
            stderr: out.stderr,
        })
    });

    match &result {
        Ok(attempts) => {
            tracing::info!(attempts, "database ready");
            console.success("Database is ready");
        }
        Err(StackupError::Timeout { attempts, .. }) => console.error(format!(
            "Database failed to become ready after {attempts} attempts"
        )),
        Err(_) => {}
    }
    result
}
