//! Formatted output for `plan` and `status`.

use std::fmt::Write as _;

use stackup_common::config::StackupConfig;
use stackup_core::state::RunState;
use stackup_runtime::compose::ServiceStatus;
use stackup_runtime::envfile::Materialized;

/// Renders `ps` results as an aligned table.
#[must_use]
pub fn format_status_table(statuses: &[ServiceStatus]) -> String {
    let width = statuses
        .iter()
        .map(|s| s.name.len())
        .max()
        .unwrap_or(0)
        .max("SERVICE".len());
    let mut out = String::new();
    let _ = writeln!(out, "{:<width$}  {:<12} STATE", "SERVICE", "RUNNING");
    for s in statuses {
        let running = if s.is_running() { "yes" } else { "no" };
        let _ = writeln!(out, "{:<width$}  {running:<12} {}", s.name, s.state);
    }
    out
}

/// Renders the dry-run plan: environment action, numbered commands, and
/// the worst-case time spent waiting.
#[must_use]
pub fn format_plan(
    config: &StackupConfig,
    state: &RunState,
    commands: &[String],
    skip_smoke: bool,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Bring-up plan");
    let _ = writeln!(out, "{}", "\u{2550}".repeat(35));
    let _ = writeln!(out);

    let env = config.environment.path.display();
    let template = config.environment.template.display();
    let _ = match state.environment {
        Some(Materialized::Created) => writeln!(out, "  + create {env} from {template}"),
        Some(Materialized::Existing) => writeln!(out, "  = keep existing {env}"),
        None => writeln!(out, "  ? {env}"),
    };
    let _ = writeln!(out);

    for (i, command) in commands.iter().enumerate() {
        let _ = writeln!(out, "  {:>2}. {command}", i + 1);
    }
    if !skip_smoke {
        let _ = writeln!(out, "  {:>2}. GET {}", commands.len() + 1, config.smoke.url);
    }
    let _ = writeln!(out);

    let mut wait = config.stack.settle() + config.database.retry().ceiling();
    if !skip_smoke {
        wait += config.smoke.retry().ceiling();
    }
    let _ = writeln!(
        out,
        "  {} command(s); database probe and smoke test retry for at most {}s.",
        commands.len(),
        wait.as_secs()
    );
    out
}
