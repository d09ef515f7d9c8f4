//! Host checks run before anything is changed.
//!
//! A missing runtime is an operator-fix condition, so nothing here retries.

use stackup_common::config::ComposeConfig;
use stackup_common::constants::DOCKER_BIN;
use stackup_common::error::{Result, StackupError};
use stackup_runtime::compose::{Compose, ComposeTool};
use stackup_runtime::runner::{CommandRunner, Invocation};

use crate::console::Console;

/// What preflight found.
#[derive(Debug, Clone)]
pub struct Runtime {
    /// Compose front-end bound to the configured manifest.
    pub compose: Compose,
    /// First line of the compose version query.
    pub compose_version: String,
}

/// Verifies the container runtime and compose tool are present and responsive.
///
/// # Errors
///
/// Returns [`StackupError::Unavailable`] naming the tool that failed.
pub fn check_runtime(
    runner: &dyn CommandRunner,
    config: &ComposeConfig,
    console: &Console,
) -> Result<Runtime> {
    console.info("Checking Docker...");
    let docker = runner
        .locate(DOCKER_BIN)
        .ok_or_else(|| StackupError::Unavailable {
            tool: DOCKER_BIN.into(),
            cause: "not found on PATH; install Docker and try again".into(),
        })?;
    let info = runner.run(&Invocation::new(docker.display().to_string()).arg("info"))?;
    if !info.success() {
        return Err(StackupError::Unavailable {
            tool: DOCKER_BIN.into(),
            cause: with_detail("the daemon is not running; start Docker and try again", &info.stderr),
        });
    }
    console.success("Docker is running");

    console.info("Checking Docker Compose...");
    let tool = ComposeTool::detect(config.tool, runner)?;
    let compose = Compose::new(tool, config);
    let version = runner.run(&compose.version())?;
    if !version.success() {
        return Err(StackupError::Unavailable {
            tool: compose.tool().display_name().into(),
            cause: with_detail("version query failed", &version.stderr),
        });
    }
    let compose_version = version.stdout.lines().next().unwrap_or_default().trim().to_string();
    tracing::info!(tool = %compose.tool(), version = %compose_version, "compose tool available");
    console.success(format!("{} is available", compose.tool()));

    Ok(Runtime {
        compose,
        compose_version,
    })
}

fn with_detail(cause: &str, stderr: &str) -> String {
    match stderr.lines().map(str::trim).find(|l| !l.is_empty()) {
        Some(detail) => format!("{cause} ({detail})"),
        None => cause.to_string(),
    }
}
