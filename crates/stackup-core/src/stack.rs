//! Stack teardown, rebuild, and launch.

use std::time::Duration;

use stackup_common::error::{Result, StackupError};
use stackup_common::types::StackDescriptor;
use stackup_runtime::compose::{self, Compose, ServiceStatus};
use stackup_runtime::probe::Pause;
use stackup_runtime::runner::{CommandRunner, run_checked};

use crate::console::Console;

/// Services observed after launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackStatus {
    /// Everything `ps` reported.
    pub services: Vec<ServiceStatus>,
}

impl StackStatus {
    /// Names of running services.
    #[must_use]
    pub fn running(&self) -> Vec<&str> {
        self.services
            .iter()
            .filter(|s| s.is_running())
            .map(|s| s.name.as_str())
            .collect()
    }
}

/// Removes any previous stack, rebuilds images from scratch, starts every
/// declared service detached, waits `settle`, and requires that at least
/// one service reports running.
///
/// Failing to remove the previous stack is not fatal: there may be nothing
/// to remove. Cancellation is checked before the build and the launch.
///
/// # Errors
///
/// Returns [`StackupError::LaunchFailure`] if build or launch fails or
/// nothing is running afterwards, and [`StackupError::Interrupted`] once
/// the run is cancelled.
pub fn bring_up_stack(
    compose: &Compose,
    descriptor: &StackDescriptor,
    settle: Duration,
    runner: &dyn CommandRunner,
    pause: &dyn Pause,
    console: &Console,
) -> Result<StackStatus> {
    console.info("Building and starting Docker services...");

    console.info("Stopping existing containers...");
    let down = runner.run(&compose.down())?;
    if !down.success() {
        tracing::warn!(exit_code = down.exit_code, "teardown of previous stack failed");
        console.warning("Could not remove previous containers; continuing");
    }

    let buildable = descriptor.buildable();
    if buildable.is_empty() {
        console.info("No locally built services declared; skipping image build");
    } else {
        pause.check()?;
        console.info("Building Docker images...");
        let _ = run_checked(runner, &compose.build_no_cache(&buildable))
            .map_err(|e| launch_failure(compose, e))?;
    }

    pause.check()?;
    console.info("Starting services...");
    let _ = run_checked(runner, &compose.up_detached(&descriptor.names()))
        .map_err(|e| launch_failure(compose, e))?;

    console.info("Waiting for services to be ready...");
    if !settle.is_zero() {
        pause.pause(settle)?;
    }

    let status = StackStatus {
        services: query_status(compose, runner)?,
    };
    let running = status.running();
    if running.is_empty() {
        return Err(StackupError::LaunchFailure {
            message: format!(
                "no service reports a running state; inspect `{}`",
                compose.logs_hint()
            ),
        });
    }
    tracing::info!(running = ?running, "stack is up");
    console.success(format!("Services running: {}", running.join(", ")));
    Ok(status)
}

fn launch_failure(compose: &Compose, error: StackupError) -> StackupError {
    match error {
        StackupError::Interrupted => error,
        other => StackupError::LaunchFailure {
            message: format!("{other}; inspect `{}`", compose.logs_hint()),
        },
    }
}

/// Queries per-service state, preferring machine-readable output.
///
/// Falls back to the text table for compose releases without
/// `ps --format json`.
///
/// # Errors
///
/// Returns an error if neither form of `ps` succeeds.
pub fn query_status(compose: &Compose, runner: &dyn CommandRunner) -> Result<Vec<ServiceStatus>> {
    let out = runner.run(&compose.ps_json())?;
    if out.success() {
        match compose::parse_ps_json(&out.stdout) {
            Ok(statuses) => return Ok(statuses),
            Err(e) => tracing::debug!(error = %e, "ps json output unreadable, using text table"),
        }
    }
    let out = run_checked(runner, &compose.ps())?;
    Ok(compose::parse_ps_text(&out.stdout))
}

/// Removes the stack and orphaned containers.
///
/// # Errors
///
/// Returns an error if the compose tool reports failure.
pub fn tear_down(compose: &Compose, runner: &dyn CommandRunner, console: &Console) -> Result<()> {
    console.info("Stopping services...");
    let _ = run_checked(runner, &compose.down())?;
    console.success("Services stopped");
    Ok(())
}
