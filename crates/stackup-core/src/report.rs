//! Final summary shown after a successful run.

use std::fmt::Write as _;

use stackup_common::config::StackupConfig;
use stackup_common::error::{ErrorCategory, StackupError};
use stackup_common::types::ServiceRole;

use crate::console::Console;
use crate::state::{AccountOutcome, RunState, SmokeOutcome};

/// Renders the summary as plain text.
///
/// The secret is printed only while it is still the development default;
/// an operator-supplied secret is never echoed.
#[must_use]
pub fn render_summary(state: &RunState, config: &StackupConfig) -> String {
    let mut out = String::new();
    let cred = &config.bootstrap_account;
    let hint = |rest: &str| {
        state.compose.as_ref().map_or_else(
            || format!("docker-compose {rest}"),
            |c| c.hint(rest),
        )
    };
    let app = config
        .stack
        .descriptor
        .by_role(ServiceRole::App)
        .map_or("web", |s| s.name.as_str());

    let _ = writeln!(out, "Bring-up complete!");
    let _ = writeln!(out);

    let _ = writeln!(out, "Access Information:");
    for endpoint in &config.report.endpoints {
        let _ = writeln!(out, "  {}: {}", endpoint.label, endpoint.url);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Admin Credentials:");
    let _ = writeln!(out, "  Username: {}", cred.name);
    let _ = writeln!(out, "  Email: {}", cred.email);
    if cred.is_development_default() {
        let _ = writeln!(out, "  Password: {}", cred.secret);
        let _ = writeln!(
            out,
            "  (development-only default; change it before exposing this stack)"
        );
    } else {
        let _ = writeln!(out, "  Password: (as configured)");
    }
    match state.account {
        Some(AccountOutcome::AlreadyPresent) => {
            let _ = writeln!(out, "  Account already existed and was left unchanged");
        }
        Some(AccountOutcome::Created) | None => {}
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Useful Commands:");
    let _ = writeln!(out, "  View logs: {}", hint("logs -f"));
    let _ = writeln!(out, "  Stop services: {}", hint("down"));
    let _ = writeln!(out, "  Restart services: {}", hint("restart"));
    let _ = writeln!(
        out,
        "  Access web shell: {}",
        hint(&format!("exec {app} {} shell", config.provisioning.manage.join(" ")))
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Run Details:");
    let _ = writeln!(out, "  Run ID: {}", state.run_id);
    let _ = writeln!(out, "  Elapsed: {}s", state.elapsed().num_seconds().max(0));
    if !state.running_services.is_empty() {
        let _ = writeln!(out, "  Services running: {}", state.running_services.join(", "));
    }
    let _ = writeln!(out, "  Retries consumed: {}", state.retries_consumed());
    let _ = writeln!(out, "  Fixtures loaded: {}", state.fixtures_loaded);
    let smoke = match &state.smoke {
        Some(SmokeOutcome::Responding { attempts }) => {
            format!("responding (attempt {attempts})")
        }
        Some(SmokeOutcome::NotResponding {
            attempts,
            last_error,
        }) => format!(
            "WARNING: not responding after {attempts} attempts{}; check {}",
            last_error
                .as_deref()
                .map(|e| format!(" ({e})"))
                .unwrap_or_default(),
            hint("logs -f")
        ),
        Some(SmokeOutcome::Skipped) | None => "skipped".to_string(),
    };
    let _ = writeln!(out, "  Smoke test: {smoke}");
    out
}

/// Prints the summary, coloring section headings.
pub fn summarize(state: &RunState, config: &StackupConfig, console: &Console) {
    console.line("");
    for line in render_summary(state, config).lines() {
        if line.starts_with("Bring-up") {
            console.line(&console.green(line));
        } else if (line.ends_with(':') && !line.starts_with(' ')) || line.contains("WARNING") {
            console.line(&console.yellow(line));
        } else {
            console.line(line);
        }
    }
}

/// Renders the operator-facing explanation of a failed run.
#[must_use]
pub fn render_failure(state: &RunState, error: &StackupError) -> String {
    let stage = state
        .failed_stage()
        .map_or_else(|| "run".to_string(), |s| s.label().to_string());
    let logs = state
        .compose
        .as_ref()
        .map_or_else(|| "docker-compose logs -f".to_string(), |c| c.logs_hint());
    let advice = match error.category() {
        ErrorCategory::Environment => "Fix the host setup and run stackup again.".to_string(),
        ErrorCategory::Launch | ErrorCategory::Readiness | ErrorCategory::Provisioning => {
            format!("Inspect the service logs with `{logs}`, then run stackup again.")
        }
        ErrorCategory::Interrupted => {
            "Interrupted. Completed stages were left in place.".to_string()
        }
        ErrorCategory::Internal => "This is likely a bug or an invalid configuration.".to_string(),
    };
    format!("{stage} failed ({}): {error}\n{advice}", error.category())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackup_common::config::ComposeConfig;
    use stackup_common::types::Credential;
    use stackup_runtime::compose::{Compose, ComposeTool};

    fn state() -> RunState {
        let mut state = RunState::new();
        state.compose = Some(Compose::new(
            ComposeTool::Plugin {
                docker: "docker".into(),
            },
            &ComposeConfig::default(),
        ));
        state.account = Some(AccountOutcome::Created);
        state.smoke = Some(SmokeOutcome::Responding { attempts: 1 });
        state.fixtures_loaded = 2;
        state.running_services = vec!["web".into(), "db".into()];
        state
    }

    #[test]
    fn lists_endpoints_credentials_and_commands() {
        let text = render_summary(&state(), &StackupConfig::default());
        assert!(text.contains("  Admin Panel: http://localhost:8000/admin"));
        assert!(text.contains("  Username: admin"));
        assert!(text.contains("development-only default"));
        assert!(text.contains("  View logs: docker compose logs -f"));
        assert!(text.contains("docker compose exec web python manage.py shell"));
        assert!(text.contains("Services running: web, db"));
        assert!(text.contains("Retries consumed: 0"));
        assert!(!text.contains("WARNING"));
    }

    #[test]
    fn configured_secret_is_not_echoed() {
        let config = StackupConfig {
            bootstrap_account: Credential {
                name: "ops".into(),
                email: "ops@example.com".into(),
                secret: "hunter2".into(),
            },
            ..StackupConfig::default()
        };
        let text = render_summary(&state(), &config);
        assert!(!text.contains("hunter2"));
        assert!(!text.contains("development-only"));
    }

    #[test]
    fn smoke_failure_is_flagged() {
        let mut state = state();
        state.smoke = Some(SmokeOutcome::NotResponding {
            attempts: 10,
            last_error: Some("connection refused".into()),
        });
        state.record_attempts(crate::state::Stage::SmokeWarned, 10);
        let text = render_summary(&state, &StackupConfig::default());
        assert!(text.contains("WARNING: not responding after 10 attempts (connection refused)"));
        assert!(text.contains("Retries consumed: 9"));
    }

    #[test]
    fn failure_names_stage_and_logs_command() {
        let mut state = state();
        for stage in [
            crate::state::Stage::PreflightOk,
            crate::state::Stage::EnvReady,
            crate::state::Stage::StackUp,
        ] {
            state.advance(stage).expect("legal");
        }
        let err = StackupError::Timeout {
            what: "database".into(),
            attempts: 30,
        };
        state.record_failure(&err);
        let text = render_failure(&state, &err);
        assert!(text.starts_with("database readiness failed (readiness)"));
        assert!(text.contains("docker compose logs -f"));
    }

    #[test]
    fn launch_failure_advises_reading_logs() {
        let mut state = state();
        for stage in [crate::state::Stage::PreflightOk, crate::state::Stage::EnvReady] {
            state.advance(stage).expect("legal");
        }
        let err = StackupError::LaunchFailure {
            message: "command `docker compose build --no-cache web` failed with exit code 1".into(),
        };
        state.record_failure(&err);
        let text = render_failure(&state, &err);
        assert!(text.starts_with("stack failed (launch)"));
        assert!(text.contains("Inspect the service logs with `docker compose logs -f`"));
        assert!(!text.contains("likely a bug"));
    }
}
