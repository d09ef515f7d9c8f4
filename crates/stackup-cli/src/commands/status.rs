//! `stackup status`: Per-service state.

use stackup_core::console::Console;
use stackup_core::{preflight, stack};
use stackup_runtime::runner::SystemRunner;

use super::Context;
use crate::output;

/// Executes the `status` command.
///
/// # Errors
///
/// Returns an error if the runtime is unavailable or `ps` fails.
#[allow(clippy::print_stdout)]
pub fn execute(ctx: &Context) -> anyhow::Result<()> {
    let runner = SystemRunner::new(&ctx.project_dir);
    let runtime = preflight::check_runtime(&runner, &ctx.config.compose, &Console::quiet())?;
    let statuses = stack::query_status(&runtime.compose, &runner)?;

    if statuses.is_empty() {
        println!("No services found.");
        return Ok(());
    }
    print!("{}", output::format_status_table(&statuses));
    Ok(())
}
