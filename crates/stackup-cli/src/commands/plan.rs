//! `stackup plan`: Show what a bring-up would do.

use stackup_common::constants::{ACCOUNT_ABSENT_EXIT, COMPOSE_STANDALONE_BIN, DOCKER_BIN};
use stackup_core::console::Console;
use stackup_core::orchestrator::{Host, Orchestrator, RunOptions};
use stackup_core::state::RunState;
use stackup_runtime::fake::{RecordingPause, ScriptedHttp, ScriptedRunner};
use stackup_runtime::runner::{CommandRunner, SystemRunner};

use super::Context;
use crate::output;

/// Executes the `plan` command.
///
/// Runs the state machine against recording doubles that answer as a
/// healthy, empty host would: tools present where `PATH` has them, every
/// probe succeeding first time, no existing bootstrap account. Nothing is
/// spawned, slept, requested, or written.
///
/// # Errors
///
/// Returns an error if a stage would fail before any command is issued,
/// e.g. a missing tool or environment template.
#[allow(clippy::print_stdout)]
pub fn execute(ctx: &Context) -> anyhow::Result<()> {
    let system = SystemRunner::new(&ctx.project_dir);
    let mut runner = ScriptedRunner::new()
        .respond("shell -c", &[ACCOUNT_ABSENT_EXIT])
        .with_running_services(&ctx.config.stack.descriptor.names());
    for program in [COMPOSE_STANDALONE_BIN, DOCKER_BIN] {
        if system.locate(program).is_none() {
            runner = runner.missing(program);
        }
    }
    let pause = RecordingPause::new();
    let http = ScriptedHttp::always(200);
    let host = Host {
        runner: &runner,
        pause: &pause,
        http: &http,
    };

    let mut state = RunState::new();
    Orchestrator::new(&ctx.config, &ctx.project_dir, host, Console::quiet())
        .with_options(RunOptions {
            skip_smoke: ctx.skip_smoke,
            dry_run: true,
        })
        .run(&mut state)?;

    print!(
        "{}",
        output::format_plan(&ctx.config, &state, &runner.command_lines(), ctx.skip_smoke)
    );
    Ok(())
}
