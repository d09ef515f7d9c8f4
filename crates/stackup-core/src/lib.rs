//! # stackup-core
//!
//! The bring-up state machine, written once and parameterized only by the
//! host seams from `stackup-runtime`.
//!
//! Stages run strictly in order:
//!
//! 1. [`preflight`]: container runtime and compose tool respond.
//! 2. [`environment`]: the environment file exists.
//! 3. [`stack`]: images rebuilt, services started, at least one running.
//! 4. [`readiness`]: the database accepts connections.
//! 5. [`provision`]: migrate, bootstrap account, seed, publish static assets.
//! 6. [`smoke`]: the application answers HTTP (a failure only warns).
//! 7. [`report`]: access points and credentials.
//!
//! [`orchestrator::Orchestrator`] drives them and threads a
//! [`state::RunState`] through the run.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod console;
pub mod environment;
pub mod orchestrator;
pub mod preflight;
pub mod provision;
pub mod readiness;
pub mod report;
pub mod smoke;
pub mod stack;
pub mod state;
