//! Host seams for the stackup bring-up.
//!
//! Everything that touches the outside world goes through a trait defined
//! here: [`runner::CommandRunner`] for processes, [`probe::Pause`] for retry
//! sleeps, and [`http::HttpProbe`] for the smoke request. The bring-up stages
//! are written once against these traits; the host only decides which
//! implementation is plugged in.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod compose;
pub mod envfile;
pub mod fake;
pub mod http;
pub mod probe;
pub mod runner;
