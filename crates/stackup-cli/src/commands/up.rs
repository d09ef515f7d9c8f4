//! `stackup up`: Full bring-up run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use stackup_core::console::Console;
use stackup_core::orchestrator::{Host, Orchestrator, RunOptions};
use stackup_core::report;
use stackup_core::state::RunState;
use stackup_runtime::http::ReqwestProbe;
use stackup_runtime::probe::ThreadPause;
use stackup_runtime::runner::SystemRunner;

use super::Context;

/// Executes the `up` command.
///
/// Ctrl+C interrupts the current wait; stages already completed are left
/// in place.
///
/// # Errors
///
/// Returns an error if any fatal stage fails.
pub fn execute(ctx: &Context) -> anyhow::Result<()> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))?;

    let runner = SystemRunner::new(&ctx.project_dir);
    let pause = ThreadPause::interruptible(cancel);
    let http = ReqwestProbe::new(ctx.config.smoke.timeout())?;
    let console = Console::detect();
    let host = Host {
        runner: &runner,
        pause: &pause,
        http: &http,
    };

    let mut state = RunState::new();
    let result = Orchestrator::new(&ctx.config, &ctx.project_dir, host, console)
        .with_options(RunOptions {
            skip_smoke: ctx.skip_smoke,
            dry_run: false,
        })
        .run(&mut state);

    if let Err(e) = result {
        for line in report::render_failure(&state, &e).lines() {
            console.error(line);
        }
        anyhow::bail!(
            "bring-up failed at {}",
            state
                .failed_stage()
                .map_or("startup", stackup_core::state::Stage::label)
        );
    }
    Ok(())
}
