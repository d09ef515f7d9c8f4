//! Process spawning behind a host-agnostic trait.
//!
//! Commands are spawned directly, never through a shell, so the same
//! invocation works on every host that has the binaries on `PATH`.

use std::fmt;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use stackup_common::error::{Result, StackupError};

/// How a child's output is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Collect stdout and stderr.
    Capture,
    /// Stream directly to the operator's terminal.
    Inherit,
}

/// A single external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name or path.
    pub program: String,
    /// Arguments, not shell-quoted.
    pub args: Vec<String>,
    /// Extra environment for the child.
    pub env: Vec<(String, String)>,
    /// Output handling.
    pub mode: OutputMode,
}

impl Invocation {
    /// Creates a captured invocation with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            mode: OutputMode::Capture,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds an environment variable for the child.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Streams output to the terminal instead of capturing it.
    #[must_use]
    pub const fn inherit(mut self) -> Self {
        self.mode = OutputMode::Inherit;
        self
    }

    /// Program and arguments joined by spaces, for logs and messages.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Output from a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Standard output (empty when inherited).
    pub stdout: String,
    /// Standard error (empty when inherited).
    pub stderr: String,
    /// Exit code, -1 if the process was killed by a signal.
    pub exit_code: i32,
}

impl ExecOutput {
    /// A successful result with the given stdout.
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    /// A result with the given exit code and no output.
    #[must_use]
    pub const fn code(exit_code: i32) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            exit_code,
        }
    }

    /// Whether the command exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes external commands on the host.
pub trait CommandRunner: Send + Sync {
    /// Runs the command to completion.
    ///
    /// A non-zero exit is not an error at this level; it is reported in
    /// [`ExecOutput::exit_code`].
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or waited on.
    fn run(&self, invocation: &Invocation) -> Result<ExecOutput>;

    /// Resolves a program name to an executable, if it is installed.
    fn locate(&self, program: &str) -> Option<PathBuf>;
}

/// Runs a command and turns a non-zero exit into [`StackupError::CommandFailed`].
///
/// # Errors
///
/// Returns an error if spawning fails or the command exits unsuccessfully.
pub fn run_checked(runner: &dyn CommandRunner, invocation: &Invocation) -> Result<ExecOutput> {
    let output = runner.run(invocation)?;
    if output.success() {
        Ok(output)
    } else {
        Err(StackupError::CommandFailed {
            command: invocation.command_line(),
            code: output.exit_code,
            stderr: output.stderr,
        })
    }
}

/// Runner that spawns real processes.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    working_dir: PathBuf,
}

impl SystemRunner {
    /// Creates a runner whose children start in `working_dir`.
    #[must_use]
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<ExecOutput> {
        tracing::debug!(command = %invocation, mode = ?invocation.mode, "spawning");

        let mut cmd = Command::new(&invocation.program);
        let _ = cmd
            .args(&invocation.args)
            .envs(invocation.env.iter().map(|(k, v)| (k, v)))
            .current_dir(&self.working_dir)
            .stdin(Stdio::null());

        let spawn_err = |e| StackupError::Io {
            path: PathBuf::from(&invocation.program),
            source: e,
        };

        let output = match invocation.mode {
            OutputMode::Capture => {
                let out = cmd.output().map_err(spawn_err)?;
                ExecOutput {
                    stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
                    exit_code: out.status.code().unwrap_or(-1),
                }
            }
            OutputMode::Inherit => {
                let status = cmd.status().map_err(spawn_err)?;
                ExecOutput::code(status.code().unwrap_or(-1))
            }
        };

        tracing::debug!(command = %invocation, exit_code = output.exit_code, "finished");
        Ok(output)
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}
