//! CLI command definitions and dispatch.

pub mod down;
pub mod plan;
pub mod status;
pub mod up;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use stackup_common::config::StackupConfig;

/// stackup: one-shot environment bring-up for a containerized web stack.
#[derive(Parser, Debug)]
#[command(name = "stackup", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute; defaults to `up`.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file (defaults to `stackup.yaml` in the project directory).
    #[arg(long, global = true, env = "STACKUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the compose manifest and environment files.
    #[arg(long, global = true, default_value = ".")]
    pub project_dir: PathBuf,

    /// Skip the application smoke test.
    #[arg(long, global = true, env = "STACKUP_SKIP_SMOKE")]
    pub skip_smoke: bool,

    /// Secret for the bootstrap account, overriding the configuration.
    #[arg(long, global = true, env = "STACKUP_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Emit log events as JSON lines.
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the full bring-up: preflight, environment, stack, readiness,
    /// provisioning, smoke test, summary.
    Up,
    /// Print the commands a bring-up would issue, without running any.
    Plan,
    /// Show the state of each service.
    Status,
    /// Stop the stack and remove orphaned containers.
    Down,
}

/// Resolved inputs shared by every command.
#[derive(Debug)]
pub struct Context {
    /// Validated configuration with CLI overrides applied.
    pub config: StackupConfig,
    /// Absolute project directory.
    pub project_dir: PathBuf,
    /// `--skip-smoke`.
    pub skip_smoke: bool,
}

impl Context {
    fn load(cli: &Cli) -> anyhow::Result<Self> {
        let project_dir = cli.project_dir.canonicalize().with_context(|| {
            format!("project directory {} is not accessible", cli.project_dir.display())
        })?;
        let mut config = StackupConfig::load(cli.config.as_deref(), &project_dir)?;
        if let Some(secret) = &cli.admin_password {
            config.bootstrap_account.secret.clone_from(secret);
        }
        tracing::debug!(project_dir = %project_dir.display(), "configuration loaded");
        Ok(Self {
            config,
            project_dir,
            skip_smoke: cli.skip_smoke,
        })
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if configuration loading or the command fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context::load(&cli)?;
    match cli.command.unwrap_or(Command::Up) {
        Command::Up => up::execute(&ctx),
        Command::Plan => plan::execute(&ctx),
        Command::Status => status::execute(&ctx),
        Command::Down => down::execute(&ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bare_invocation_means_up() {
        let cli = Cli::try_parse_from(["stackup"]).expect("parse");
        assert_eq!(cli.command, None);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn admin_password_reaches_account_creation_but_not_the_summary() {
        use stackup_common::constants::ACCOUNT_ABSENT_EXIT;
        use stackup_core::console::Console;
        use stackup_core::orchestrator::{Host, Orchestrator};
        use stackup_core::report::render_summary;
        use stackup_core::state::RunState;
        use stackup_runtime::fake::{RecordingPause, ScriptedHttp, ScriptedRunner};

        let dir = tempfile::tempdir().expect("tempdir");
        let config_path = dir.path().join("stackup.yaml");
        std::fs::write(&config_path, include_str!("../../../../stackup.yaml")).expect("config");
        std::fs::write(dir.path().join("env.example"), "DEBUG=1\n").expect("template");

        let args: Vec<std::ffi::OsString> = vec![
            "stackup".into(),
            "--config".into(),
            config_path.clone().into_os_string(),
            "--project-dir".into(),
            dir.path().as_os_str().to_owned(),
            "--admin-password".into(),
            "s3cret-override".into(),
        ];
        let cli = Cli::try_parse_from(args).expect("parse");
        let ctx = Context::load(&cli).expect("load");
        assert_eq!(ctx.config.bootstrap_account.secret, "s3cret-override");
        assert!(!ctx.config.bootstrap_account.is_development_default());

        let runner = ScriptedRunner::new()
            .respond("shell -c", &[ACCOUNT_ABSENT_EXIT])
            .with_running_services(&ctx.config.stack.descriptor.names());
        let pause = RecordingPause::new();
        let http = ScriptedHttp::always(200);
        let host = Host {
            runner: &runner,
            pause: &pause,
            http: &http,
        };
        let mut state = RunState::new();
        Orchestrator::new(&ctx.config, &ctx.project_dir, host, Console::quiet())
            .run(&mut state)
            .expect("run");

        let create = runner
            .calls()
            .into_iter()
            .find(|c| c.command_line().contains("createsuperuser"))
            .expect("account created");
        assert!(create.env.contains(&(
            "DJANGO_SUPERUSER_PASSWORD".to_string(),
            "s3cret-override".to_string()
        )));
        assert!(!runner.command_lines().iter().any(|l| l.contains("s3cret-override")));

        let summary = render_summary(&state, &ctx.config);
        assert!(!summary.contains("s3cret-override"));
        assert!(summary.contains("Password: (as configured)"));
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from(["stackup", "plan", "--skip-smoke", "-vv"]).expect("parse");
        assert_eq!(cli.command, Some(Command::Plan));
        assert!(cli.skip_smoke);
        assert_eq!(cli.verbose, 2);
    }
}
