//! Compose tool front-end.
//!
//! Builds invocations for either the standalone `docker-compose` binary or
//! the `docker compose` plugin and parses the service status it reports.

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;
use stackup_common::config::{ComposeConfig, ComposePreference};
use stackup_common::constants::{COMPOSE_STANDALONE_BIN, DOCKER_BIN};
use stackup_common::error::{Result, StackupError};

use crate::runner::{CommandRunner, Invocation};

/// The compose front-end in use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeTool {
    /// `docker-compose <args>`.
    Standalone {
        /// Resolved binary.
        binary: String,
    },
    /// `docker compose <args>`.
    Plugin {
        /// Resolved docker binary.
        docker: String,
    },
}

impl ComposeTool {
    /// Picks a front-end according to `preference`.
    ///
    /// `Auto` prefers the standalone binary and falls back to the plugin.
    /// Whether the chosen front-end actually works is checked later by
    /// running its version query.
    ///
    /// # Errors
    ///
    /// Returns [`StackupError::Unavailable`] if the required binary is not
    /// on `PATH`.
    pub fn detect(preference: ComposePreference, runner: &dyn CommandRunner) -> Result<Self> {
        let standalone = || {
            runner.locate(COMPOSE_STANDALONE_BIN).map(|p| Self::Standalone {
                binary: p.display().to_string(),
            })
        };
        let plugin = || {
            runner.locate(DOCKER_BIN).map(|p| Self::Plugin {
                docker: p.display().to_string(),
            })
        };

        let found = match preference {
            ComposePreference::Auto => standalone().or_else(plugin),
            ComposePreference::Standalone => standalone(),
            ComposePreference::Plugin => plugin(),
        };
        found.ok_or_else(|| StackupError::Unavailable {
            tool: match preference {
                ComposePreference::Plugin => "docker compose".into(),
                _ => COMPOSE_STANDALONE_BIN.into(),
            },
            cause: "not found on PATH; install Docker Compose and try again".into(),
        })
    }

    /// Program to spawn.
    #[must_use]
    pub fn program(&self) -> &str {
        match self {
            Self::Standalone { binary } => binary,
            Self::Plugin { docker } => docker,
        }
    }

    /// How the operator would type this front-end.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Standalone { .. } => COMPOSE_STANDALONE_BIN,
            Self::Plugin { .. } => "docker compose",
        }
    }

    fn base(&self) -> Invocation {
        match self {
            Self::Standalone { binary } => Invocation::new(binary),
            Self::Plugin { docker } => Invocation::new(docker).arg("compose"),
        }
    }
}

impl fmt::Display for ComposeTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Invocation builder bound to one manifest and project.
#[derive(Debug, Clone)]
pub struct Compose {
    tool: ComposeTool,
    file: Option<PathBuf>,
    project_name: Option<String>,
}

impl Compose {
    /// Creates a builder for `tool` using the manifest settings in `config`.
    #[must_use]
    pub fn new(tool: ComposeTool, config: &ComposeConfig) -> Self {
        Self {
            tool,
            file: config.file.clone(),
            project_name: config.project_name.clone(),
        }
    }

    /// The front-end in use.
    #[must_use]
    pub const fn tool(&self) -> &ComposeTool {
        &self.tool
    }

    /// `<compose> version`. Global manifest flags are not needed here.
    #[must_use]
    pub fn version(&self) -> Invocation {
        self.tool.base().arg("version")
    }

    /// `<compose> down --remove-orphans`.
    #[must_use]
    pub fn down(&self) -> Invocation {
        self.command(["down", "--remove-orphans"]).inherit()
    }

    /// `<compose> build --no-cache [services...]`.
    #[must_use]
    pub fn build_no_cache(&self, services: &[String]) -> Invocation {
        self.command(["build", "--no-cache"])
            .args(services.iter().cloned())
            .inherit()
    }

    /// `<compose> up -d [services...]`.
    #[must_use]
    pub fn up_detached(&self, services: &[String]) -> Invocation {
        self.command(["up", "-d"]).args(services.iter().cloned()).inherit()
    }

    /// `<compose> ps --format json`.
    #[must_use]
    pub fn ps_json(&self) -> Invocation {
        self.command(["ps", "--format", "json"])
    }

    /// `<compose> ps`.
    #[must_use]
    pub fn ps(&self) -> Invocation {
        self.command(["ps"])
    }

    /// `<compose> exec -T [-e KEY...] <service> <argv...>`.
    ///
    /// Values in `env` are set on the compose process and forwarded by name,
    /// so they never appear on the command line.
    #[must_use]
    pub fn exec(&self, service: &str, argv: &[String], env: &[(String, String)]) -> Invocation {
        let mut inv = self.command(["exec", "-T"]);
        for (key, value) in env {
            inv = inv.arg("-e").arg(key.as_str()).env(key.as_str(), value.as_str());
        }
        inv.arg(service).args(argv.iter().cloned())
    }

    /// Follow-up command an operator types to inspect logs.
    #[must_use]
    pub fn logs_hint(&self) -> String {
        self.hint("logs -f")
    }

    /// Renders `<compose> [flags] <rest>` as the operator would type it.
    #[must_use]
    pub fn hint(&self, rest: &str) -> String {
        let flags = self.global_flags().join(" ");
        if flags.is_empty() {
            format!("{} {rest}", self.tool.display_name())
        } else {
            format!("{} {flags} {rest}", self.tool.display_name())
        }
    }

    fn global_flags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        if let Some(file) = &self.file {
            flags.push("-f".to_string());
            flags.push(file.display().to_string());
        }
        if let Some(project) = &self.project_name {
            flags.push("-p".to_string());
            flags.push(project.clone());
        }
        flags
    }

    fn command<const N: usize>(&self, args: [&str; N]) -> Invocation {
        self.tool.base().args(self.global_flags()).args(args)
    }
}

/// State of one service as reported by `ps`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    /// Service (or container) name.
    pub name: String,
    /// Reported state, e.g. `running`, `exited`.
    pub state: String,
}

impl ServiceStatus {
    /// Whether the service is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.eq_ignore_ascii_case("running") || self.state.starts_with("Up")
    }
}

#[derive(Debug, Deserialize)]
struct PsRow {
    #[serde(rename = "Service", default)]
    service: String,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "State", default)]
    state: String,
    #[serde(rename = "Status", default)]
    status: String,
}

impl From<PsRow> for ServiceStatus {
    fn from(row: PsRow) -> Self {
        let name = if row.service.is_empty() {
            row.name
        } else {
            row.service
        };
        let state = if row.state.is_empty() {
            row.status
        } else {
            row.state
        };
        Self { name, state }
    }
}

/// Parses `ps --format json` output.
///
/// Accepts both a JSON array and one object per line, which is what
/// different compose releases emit.
///
/// # Errors
///
/// Returns an error if the output is not JSON in either shape.
pub fn parse_ps_json(stdout: &str) -> Result<Vec<ServiceStatus>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        let rows: Vec<PsRow> = serde_json::from_str(trimmed)?;
        return Ok(rows.into_iter().map(Into::into).collect());
    }
    trimmed
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| {
            serde_json::from_str::<PsRow>(l)
                .map(Into::into)
                .map_err(Into::into)
        })
        .collect()
}

/// Parses the human-readable `ps` table.
///
/// Only distinguishes running from not running; the state column layout
/// differs between releases.
#[must_use]
pub fn parse_ps_text(stdout: &str) -> Vec<ServiceStatus> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter(|l| !l.starts_with("NAME") && !l.starts_with("Name"))
        .filter(|l| !l.chars().all(|c| c == '-'))
        .filter_map(|line| {
            let name = line.split_whitespace().next()?.to_string();
            let running = line.contains(" Up") || line.to_ascii_lowercase().contains("running");
            Some(ServiceStatus {
                name,
                state: if running { "running" } else { "not running" }.to_string(),
            })
        })
        .collect()
}
