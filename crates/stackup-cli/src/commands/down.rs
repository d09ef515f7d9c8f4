//! `stackup down`: Stop the stack.

use stackup_core::console::Console;
use stackup_core::{preflight, stack};
use stackup_runtime::runner::SystemRunner;

use super::Context;

/// Executes the `down` command.
///
/// # Errors
///
/// Returns an error if the runtime is unavailable or teardown fails.
pub fn execute(ctx: &Context) -> anyhow::Result<()> {
    let runner = SystemRunner::new(&ctx.project_dir);
    let console = Console::detect();
    let runtime = preflight::check_runtime(&runner, &ctx.config.compose, &console)?;
    stack::tear_down(&runtime.compose, &runner, &console)?;
    Ok(())
}
