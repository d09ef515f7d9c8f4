//! Drives the stages in order and threads [`RunState`] through them.
//!
//! The orchestrator only sees the host through [`Host`], so a real run and
//! a dry run (`stackup plan`) execute exactly the same sequence.

use std::path::{Path, PathBuf};

use stackup_common::config::StackupConfig;
use stackup_common::error::{Result, StackupError};
use stackup_common::types::{ProvisionStep, ServiceRole};
use stackup_runtime::http::HttpProbe;
use stackup_runtime::probe::Pause;
use stackup_runtime::runner::CommandRunner;

use crate::console::Console;
use crate::provision::Provisioner;
use crate::state::{RunState, SmokeOutcome, Stage};
use crate::{environment, preflight, readiness, report, smoke, stack};

/// Host capabilities a run depends on.
#[derive(Clone, Copy)]
pub struct Host<'a> {
    /// Spawns external commands.
    pub runner: &'a dyn CommandRunner,
    /// Waits between probe attempts and reports cancellation.
    pub pause: &'a dyn Pause,
    /// Issues the smoke request.
    pub http: &'a dyn HttpProbe,
}

/// Per-invocation switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Skip the smoke test entirely.
    pub skip_smoke: bool,
    /// Inspect the environment file instead of creating it.
    pub dry_run: bool,
}

/// Runs the bring-up state machine.
pub struct Orchestrator<'a> {
    config: &'a StackupConfig,
    project_dir: PathBuf,
    host: Host<'a>,
    console: Console,
    options: RunOptions,
}

impl<'a> Orchestrator<'a> {
    /// Creates an orchestrator. Relative paths in `config` resolve against
    /// `project_dir`.
    #[must_use]
    pub fn new(
        config: &'a StackupConfig,
        project_dir: impl Into<PathBuf>,
        host: Host<'a>,
        console: Console,
    ) -> Self {
        Self {
            config,
            project_dir: project_dir.into(),
            host,
            console,
            options: RunOptions::default(),
        }
    }

    /// Replaces the run options.
    #[must_use]
    pub const fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Executes every stage in order, stopping at the first fatal failure.
    ///
    /// Cancellation is checked before every stage and provisioning
    /// sub-step. A failure observed after cancellation was requested is
    /// reported as [`StackupError::Interrupted`]. On failure the error is
    /// also recorded in `state`.
    ///
    /// # Errors
    ///
    /// Returns the error of the stage that failed.
    pub fn run(&self, state: &mut RunState) -> Result<()> {
        let span = tracing::info_span!("bringup", run_id = %state.run_id);
        let _enter = span.enter();

        let result = self.stages(state).map_err(|e| match self.host.pause.check() {
            Err(interrupted) => interrupted,
            Ok(()) => e,
        });
        if let Err(e) = &result {
            state.record_failure(e);
            tracing::error!(stage = ?state.failed_stage(), error = %e, category = %e.category(), "bring-up failed");
        }
        result
    }

    fn stages(&self, state: &mut RunState) -> Result<()> {
        let Host {
            runner,
            pause,
            http,
        } = self.host;
        let config = self.config;
        let console = &self.console;
        let descriptor = &config.stack.descriptor;

        console.banner("stackup: environment bring-up");

        pause.check()?;
        let runtime = preflight::check_runtime(runner, &config.compose, console)?;
        state.compose = Some(runtime.compose.clone());
        state.advance(Stage::PreflightOk)?;
        let compose = &runtime.compose;

        pause.check()?;
        let env_path = self.resolve(&config.environment.path);
        let template = self.resolve(&config.environment.template);
        let materialized = if self.options.dry_run {
            environment::preview_environment_file(&env_path, &template)?
        } else {
            environment::ensure_environment_file(&env_path, &template, console)?
        };
        state.environment = Some(materialized);
        state.advance(Stage::EnvReady)?;

        pause.check()?;
        let status = stack::bring_up_stack(
            compose,
            descriptor,
            config.stack.settle(),
            runner,
            pause,
            console,
        )?;
        state.running_services = status.running().into_iter().map(str::to_string).collect();
        state.advance(Stage::StackUp)?;

        pause.check()?;
        let database = service_for(config, ServiceRole::Database)?;
        let attempts = readiness::wait_for_database(
            compose,
            database,
            &config.database.probe,
            config.database.retry(),
            runner,
            pause,
            console,
        )
        .inspect_err(|e| {
            if let StackupError::Timeout { attempts, .. } = e {
                state.record_attempts(Stage::DbReady, *attempts);
            }
        })?;
        state.record_attempts(Stage::DbReady, attempts);
        state.advance(Stage::DbReady)?;

        let app = service_for(config, ServiceRole::App)?;
        let provisioner = Provisioner::new(compose, app, &config.provisioning, runner, console);
        for step in ProvisionStep::ORDER {
            pause.check()?;
            let reached = match step {
                ProvisionStep::Migrate => {
                    provisioner.migrate()?;
                    Stage::Migrated
                }
                ProvisionStep::Account => {
                    state.account = Some(provisioner.ensure_account(&config.bootstrap_account)?);
                    Stage::AccountReady
                }
                ProvisionStep::Seed => {
                    state.fixtures_loaded = provisioner.load_seed(&config.provisioning.fixtures)?;
                    Stage::Seeded
                }
                ProvisionStep::Static => {
                    provisioner.publish_static(config.provisioning.clear_static)?;
                    Stage::StaticReady
                }
            };
            state.advance(reached)?;
        }

        pause.check()?;
        if self.options.skip_smoke {
            console.info("Skipping application smoke test");
            state.smoke = Some(SmokeOutcome::Skipped);
        } else {
            let outcome = smoke::verify_serving(
                &config.smoke.url,
                config.smoke.retry(),
                http,
                pause,
                console,
            )?;
            let reached = match &outcome {
                SmokeOutcome::Responding { attempts } => Some((Stage::SmokeResponding, *attempts)),
                SmokeOutcome::NotResponding { attempts, .. } => {
                    Some((Stage::SmokeWarned, *attempts))
                }
                SmokeOutcome::Skipped => None,
            };
            if let Some((stage, attempts)) = reached {
                state.record_attempts(stage, attempts);
                state.advance(stage)?;
            }
            state.smoke = Some(outcome);
        }
        state.advance(Stage::Done)?;

        tracing::info!(
            retries = state.retries_consumed(),
            elapsed_secs = state.elapsed().num_seconds(),
            "bring-up complete"
        );
        report::summarize(state, config, console);
        Ok(())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }
}

fn service_for(config: &StackupConfig, role: ServiceRole) -> Result<&str> {
    config
        .stack
        .descriptor
        .by_role(role)
        .map(|s| s.name.as_str())
        .ok_or_else(|| StackupError::NotFound {
            kind: "service with role",
            id: role.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackup_runtime::envfile::Materialized;
    use stackup_runtime::fake::{RecordingPause, ScriptedHttp, ScriptedRunner};
    use stackup_runtime::runner::{ExecOutput, Invocation};

    /// Raises cancellation when a matching command runs, the way Ctrl+C
    /// reaches both the child and the cancel flag.
    struct CancelOn<'a> {
        inner: ScriptedRunner,
        pattern: &'static str,
        pause: &'a RecordingPause,
    }

    impl CommandRunner for CancelOn<'_> {
        fn run(&self, invocation: &Invocation) -> Result<ExecOutput> {
            if invocation.command_line().contains(self.pattern) {
                self.pause.cancel();
            }
            self.inner.run(invocation)
        }

        fn locate(&self, program: &str) -> Option<std::path::PathBuf> {
            self.inner.locate(program)
        }
    }

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("env.example"), "DEBUG=1\n").expect("template");
        dir
    }

    #[test]
    fn dry_run_leaves_environment_untouched() {
        let dir = project();
        let config = StackupConfig::default();
        let runner = ScriptedRunner::new().with_running_services(&config.stack.descriptor.names());
        let pause = RecordingPause::new();
        let http = ScriptedHttp::always(200);
        let host = Host {
            runner: &runner,
            pause: &pause,
            http: &http,
        };

        let mut state = RunState::new();
        Orchestrator::new(&config, dir.path(), host, Console::quiet())
            .with_options(RunOptions {
                dry_run: true,
                ..RunOptions::default()
            })
            .run(&mut state)
            .expect("dry run");

        assert_eq!(state.environment, Some(Materialized::Created));
        assert!(!dir.path().join("env.docker").exists());
        assert!(state.is_done());
    }

    #[test]
    fn skip_smoke_issues_no_request() {
        let dir = project();
        let config = StackupConfig::default();
        let runner = ScriptedRunner::new().with_running_services(&config.stack.descriptor.names());
        let pause = RecordingPause::new();
        let http = ScriptedHttp::always(200);
        let host = Host {
            runner: &runner,
            pause: &pause,
            http: &http,
        };

        let mut state = RunState::new();
        Orchestrator::new(&config, dir.path(), host, Console::quiet())
            .with_options(RunOptions {
                skip_smoke: true,
                ..RunOptions::default()
            })
            .run(&mut state)
            .expect("run");

        assert!(http.requests().is_empty());
        assert_eq!(state.smoke, Some(SmokeOutcome::Skipped));
        assert_eq!(state.completed().last(), Some(&Stage::Done));
        assert!(!state.completed().contains(&Stage::SmokeResponding));
    }

    #[test]
    fn relative_paths_resolve_against_project_dir() {
        let dir = project();
        let config = StackupConfig::default();
        let runner = ScriptedRunner::new().with_running_services(&config.stack.descriptor.names());
        let pause = RecordingPause::new();
        let http = ScriptedHttp::always(200);
        let orchestrator = Orchestrator::new(
            &config,
            dir.path(),
            Host {
                runner: &runner,
                pause: &pause,
                http: &http,
            },
            Console::quiet(),
        );
        assert_eq!(
            orchestrator.resolve(Path::new("env.docker")),
            dir.path().join("env.docker")
        );
        assert_eq!(
            orchestrator.resolve(Path::new("/etc/env")),
            PathBuf::from("/etc/env")
        );
    }

    #[test]
    fn cancelled_run_issues_no_command() {
        let dir = project();
        let config = StackupConfig::default();
        let runner = ScriptedRunner::new().with_running_services(&config.stack.descriptor.names());
        let pause = RecordingPause::new();
        pause.cancel();
        let http = ScriptedHttp::always(200);
        let host = Host {
            runner: &runner,
            pause: &pause,
            http: &http,
        };

        let mut state = RunState::new();
        let err = Orchestrator::new(&config, dir.path(), host, Console::quiet())
            .run(&mut state)
            .expect_err("cancelled");

        assert!(matches!(err, StackupError::Interrupted));
        assert!(runner.calls().is_empty());
        assert!(http.requests().is_empty());
        assert!(!dir.path().join("env.docker").exists());
        assert_eq!(state.failed_stage(), Some(Stage::PreflightOk));
        assert!(!state.is_done());
    }

    #[test]
    fn child_killed_by_cancel_is_reported_as_interrupted() {
        let dir = project();
        let config = StackupConfig::default();
        let pause = RecordingPause::new();
        let runner = CancelOn {
            inner: ScriptedRunner::new()
                .respond("manage.py migrate", &[130])
                .with_running_services(&config.stack.descriptor.names()),
            pattern: "manage.py migrate",
            pause: &pause,
        };
        let http = ScriptedHttp::always(200);
        let host = Host {
            runner: &runner,
            pause: &pause,
            http: &http,
        };

        let mut state = RunState::new();
        let err = Orchestrator::new(&config, dir.path(), host, Console::quiet())
            .run(&mut state)
            .expect_err("cancelled");

        assert!(matches!(err, StackupError::Interrupted));
        assert_eq!(state.failed_stage(), Some(Stage::Migrated));
        assert_eq!(runner.inner.count_matching("createsuperuser"), 0);
        assert!(http.requests().is_empty());
    }

    #[test]
    fn cancel_during_teardown_skips_the_rebuild() {
        let dir = project();
        let config = StackupConfig::default();
        let pause = RecordingPause::new();
        let runner = CancelOn {
            inner: ScriptedRunner::new().with_running_services(&config.stack.descriptor.names()),
            pattern: "down --remove-orphans",
            pause: &pause,
        };
        let http = ScriptedHttp::always(200);
        let host = Host {
            runner: &runner,
            pause: &pause,
            http: &http,
        };

        let mut state = RunState::new();
        let err = Orchestrator::new(&config, dir.path(), host, Console::quiet())
            .run(&mut state)
            .expect_err("cancelled");

        assert!(matches!(err, StackupError::Interrupted));
        assert_eq!(runner.inner.count_matching("build --no-cache"), 0);
        assert_eq!(runner.inner.count_matching("up -d"), 0);
        assert_eq!(runner.inner.count_matching("pg_isready"), 0);
        assert!(pause.pauses().is_empty());
    }

    #[test]
    fn running_services_are_kept_for_the_summary() {
        let dir = project();
        let config = StackupConfig::default();
        let runner = ScriptedRunner::new().with_running_services(&config.stack.descriptor.names());
        let pause = RecordingPause::new();
        let http = ScriptedHttp::always(200);
        let host = Host {
            runner: &runner,
            pause: &pause,
            http: &http,
        };

        let mut state = RunState::new();
        Orchestrator::new(&config, dir.path(), host, Console::quiet())
            .run(&mut state)
            .expect("run");

        assert_eq!(state.running_services, config.stack.descriptor.names());
    }
}
