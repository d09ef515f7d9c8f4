//! Run state threaded through every stage.
//!
//! A [`RunState`] lives for one invocation and is never persisted. It
//! accepts only forward transitions to an immediate successor, so no stage
//! can be entered unless every gating stage before it completed.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use stackup_common::error::{Result, StackupError};
use stackup_runtime::compose::Compose;
use stackup_runtime::envfile::Materialized;
use uuid::Uuid;

/// Position in the bring-up state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Nothing has run yet.
    Init,
    /// Runtime and compose tool respond.
    PreflightOk,
    /// Environment file is present.
    EnvReady,
    /// Services launched and at least one running.
    StackUp,
    /// Database accepts connections.
    DbReady,
    /// Migrations generated and applied.
    Migrated,
    /// Bootstrap account exists.
    AccountReady,
    /// Fixtures loaded.
    Seeded,
    /// Static assets published.
    StaticReady,
    /// Application answered the smoke request.
    SmokeResponding,
    /// Application never answered; the run still succeeds.
    SmokeWarned,
    /// Run complete.
    Done,
}

impl Stage {
    /// Stages reachable from `self` in one step.
    #[must_use]
    pub const fn successors(self) -> &'static [Self] {
        match self {
            Self::Init => &[Self::PreflightOk],
            Self::PreflightOk => &[Self::EnvReady],
            Self::EnvReady => &[Self::StackUp],
            Self::StackUp => &[Self::DbReady],
            Self::DbReady => &[Self::Migrated],
            Self::Migrated => &[Self::AccountReady],
            Self::AccountReady => &[Self::Seeded],
            Self::Seeded => &[Self::StaticReady],
            Self::StaticReady => &[Self::SmokeResponding, Self::SmokeWarned, Self::Done],
            Self::SmokeResponding | Self::SmokeWarned => &[Self::Done],
            Self::Done => &[],
        }
    }

    /// Short label for logs and messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::PreflightOk => "preflight",
            Self::EnvReady => "environment",
            Self::StackUp => "stack",
            Self::DbReady => "database readiness",
            Self::Migrated => "migration",
            Self::AccountReady => "bootstrap account",
            Self::Seeded => "seed data",
            Self::StaticReady => "static assets",
            Self::SmokeResponding => "smoke test",
            Self::SmokeWarned => "smoke test (warned)",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of the bootstrap account step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountOutcome {
    /// The account was created by this run.
    Created,
    /// An account with that name already existed and was left unchanged.
    AlreadyPresent,
}

/// Result of the smoke test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmokeOutcome {
    /// A 2xx response arrived.
    Responding {
        /// Attempts used.
        attempts: u32,
    },
    /// No 2xx response within the attempt budget.
    NotResponding {
        /// Attempts used.
        attempts: u32,
        /// Last failure observed.
        last_error: Option<String>,
    },
    /// Disabled by the operator.
    Skipped,
}

/// Transient state of one bring-up invocation.
#[derive(Debug, Clone)]
pub struct RunState {
    /// Identifier attached to log events of this run.
    pub run_id: Uuid,
    /// Wall-clock start.
    pub started_at: DateTime<Utc>,
    stage: Stage,
    completed: Vec<Stage>,
    attempts: BTreeMap<Stage, u32>,
    last_error: Option<String>,
    failed_after: Option<Stage>,
    /// Compose front-end detected by preflight.
    pub compose: Option<Compose>,
    /// What the environment step did.
    pub environment: Option<Materialized>,
    /// Services reported running once the stack was launched.
    pub running_services: Vec<String>,
    /// What the account step did.
    pub account: Option<AccountOutcome>,
    /// What the smoke step observed.
    pub smoke: Option<SmokeOutcome>,
    /// Fixtures loaded by the seed step.
    pub fixtures_loaded: usize,
}

impl RunState {
    /// Fresh state at [`Stage::Init`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            stage: Stage::Init,
            completed: Vec::new(),
            attempts: BTreeMap::new(),
            last_error: None,
            failed_after: None,
            compose: None,
            environment: None,
            running_services: Vec::new(),
            account: None,
            smoke: None,
            fixtures_loaded: 0,
        }
    }

    /// Current stage.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Stages reached so far, in order.
    #[must_use]
    pub fn completed(&self) -> &[Stage] {
        &self.completed
    }

    /// Moves to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`StackupError::Config`] if `next` is not an immediate
    /// successor of the current stage.
    pub fn advance(&mut self, next: Stage) -> Result<()> {
        if !self.stage.successors().contains(&next) {
            return Err(StackupError::Config {
                message: format!("illegal stage transition {} -> {next}", self.stage),
            });
        }
        tracing::debug!(run_id = %self.run_id, from = %self.stage, to = %next, "stage transition");
        let _ = self.attempts.entry(next).or_insert(1);
        self.stage = next;
        self.completed.push(next);
        Ok(())
    }

    /// Records how many probe attempts reaching `stage` took.
    pub fn record_attempts(&mut self, stage: Stage, attempts: u32) {
        let _ = self.attempts.insert(stage, attempts);
    }

    /// Attempts used to reach `stage`, if it was reached or attempted.
    #[must_use]
    pub fn attempts(&self, stage: Stage) -> Option<u32> {
        self.attempts.get(&stage).copied()
    }

    /// Attempts beyond the first, summed over all stages.
    #[must_use]
    pub fn retries_consumed(&self) -> u32 {
        self.attempts.values().map(|n| n.saturating_sub(1)).sum()
    }

    /// Notes a fatal failure at the current stage.
    pub fn record_failure(&mut self, error: &StackupError) {
        self.last_error = Some(error.to_string());
        self.failed_after = Some(self.stage);
    }

    /// Last fatal error observed.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Stage that failed, i.e. the successor of the last completed stage.
    #[must_use]
    pub fn failed_stage(&self) -> Option<Stage> {
        self.failed_after
            .and_then(|s| s.successors().first().copied())
    }

    /// Whether the run reached [`Stage::Done`].
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.stage == Stage::Done
    }

    /// Time since the run started.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
