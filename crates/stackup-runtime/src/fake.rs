//! In-memory stand-ins for the host seams.
//!
//! `stackup plan` runs the full state machine against these to list the
//! commands a real run would issue, without spawning anything, sleeping, or
//! touching the network. Tests use the same types to script failures.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use stackup_common::error::{Result, StackupError};

use crate::http::HttpProbe;
use crate::probe::Pause;
use crate::runner::{CommandRunner, ExecOutput, Invocation};

fn poisoned(what: &str) -> StackupError {
    StackupError::Config {
        message: format!("{what} lock poisoned"),
    }
}

#[derive(Debug)]
struct Rule {
    pattern: String,
    replies: VecDeque<ExecOutput>,
}

impl Rule {
    fn next(&mut self) -> ExecOutput {
        if self.replies.len() > 1 {
            self.replies.pop_front().unwrap_or_default()
        } else {
            self.replies.front().cloned().unwrap_or_default()
        }
    }
}

/// Records every invocation and answers from a script.
///
/// Unscripted commands succeed with empty output. A scripted reply
/// sequence is consumed in order and its last entry repeats.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    calls: Mutex<Vec<Invocation>>,
    rules: Mutex<Vec<Rule>>,
    missing: Vec<String>,
}

impl ScriptedRunner {
    /// Creates a runner where every program exists and every command succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers commands whose command line contains `pattern` with the
    /// given exit codes, in order. The first matching rule wins.
    #[must_use]
    pub fn respond(self, pattern: &str, exit_codes: &[i32]) -> Self {
        self.respond_with(
            pattern,
            exit_codes.iter().copied().map(ExecOutput::code).collect(),
        )
    }

    /// Answers commands whose command line contains `pattern` with the
    /// given outputs, in order.
    #[must_use]
    pub fn respond_with(mut self, pattern: &str, replies: Vec<ExecOutput>) -> Self {
        if let Ok(rules) = self.rules.get_mut() {
            rules.push(Rule {
                pattern: pattern.to_string(),
                replies: replies.into(),
            });
        }
        self
    }

    /// Makes `ps --format json` report every named service as running.
    #[must_use]
    pub fn with_running_services(self, services: &[String]) -> Self {
        let rows: Vec<_> = services
            .iter()
            .map(|s| serde_json::json!({ "Service": s, "State": "running" }))
            .collect();
        let body = serde_json::Value::Array(rows).to_string();
        self.respond_with("ps --format json", vec![ExecOutput::ok(body)])
    }

    /// Pretends `program` is not installed.
    #[must_use]
    pub fn missing(mut self, program: &str) -> Self {
        self.missing.push(program.to_string());
        self
    }

    /// Every invocation so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Command lines of every invocation so far, in order.
    #[must_use]
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(Invocation::command_line).collect()
    }

    /// Number of invocations whose command line contains `pattern`.
    #[must_use]
    pub fn count_matching(&self, pattern: &str) -> usize {
        self.command_lines()
            .iter()
            .filter(|l| l.contains(pattern))
            .count()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> Result<ExecOutput> {
        let line = invocation.command_line();
        self.calls
            .lock()
            .map_err(|_| poisoned("runner"))?
            .push(invocation.clone());

        let mut rules = self.rules.lock().map_err(|_| poisoned("runner"))?;
        let reply = rules
            .iter_mut()
            .find(|r| line.contains(&r.pattern))
            .map_or_else(|| ExecOutput::ok(""), Rule::next);
        tracing::trace!(command = %line, exit_code = reply.exit_code, "scripted reply");
        Ok(reply)
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        (!self.missing.iter().any(|m| m == program)).then(|| PathBuf::from(program))
    }
}

/// Records requested pauses without sleeping.
#[derive(Debug, Default)]
pub struct RecordingPause {
    pauses: Mutex<Vec<Duration>>,
    interrupt_after: Option<usize>,
    cancelled: AtomicBool,
}

impl RecordingPause {
    /// Creates a pause that always returns immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lets `n` pauses through, then reports an interruption.
    #[must_use]
    pub const fn interrupt_after(mut self, n: usize) -> Self {
        self.interrupt_after = Some(n);
        self
    }

    /// Marks the run as cancelled; every later check or pause fails.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Durations requested so far.
    #[must_use]
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Sum of all requested durations.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.pauses().iter().sum()
    }
}

impl Pause for RecordingPause {
    fn check(&self) -> Result<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(StackupError::Interrupted)
        } else {
            Ok(())
        }
    }

    fn pause(&self, duration: Duration) -> Result<()> {
        self.check()?;
        let mut pauses = self.pauses.lock().map_err(|_| poisoned("pause"))?;
        if self.interrupt_after.is_some_and(|n| pauses.len() >= n) {
            return Err(StackupError::Interrupted);
        }
        pauses.push(duration);
        Ok(())
    }
}

/// Answers GETs from a script; the last reply repeats.
#[derive(Debug)]
pub struct ScriptedHttp {
    replies: Mutex<VecDeque<std::result::Result<u16, String>>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedHttp {
    /// Replies with the given statuses (or connection errors) in order.
    #[must_use]
    pub fn sequence(replies: Vec<std::result::Result<u16, String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always replies with `status`.
    #[must_use]
    pub fn always(status: u16) -> Self {
        Self::sequence(vec![Ok(status)])
    }

    /// Never connects.
    #[must_use]
    pub fn unreachable() -> Self {
        Self::sequence(vec![Err("connection refused".into())])
    }

    /// URLs requested so far.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl HttpProbe for ScriptedHttp {
    fn get_status(&self, url: &str) -> Result<u16> {
        self.requests
            .lock()
            .map_err(|_| poisoned("http"))?
            .push(url.to_string());
        let mut replies = self.replies.lock().map_err(|_| poisoned("http"))?;
        let reply = if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        };
        match reply {
            Some(Ok(status)) => Ok(status),
            Some(Err(message)) => Err(StackupError::Http {
                url: url.to_string(),
                message,
            }),
            None => Ok(200),
        }
    }
}
