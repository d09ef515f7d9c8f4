//! Unified error type for the stackup workspace.
//!
//! Every stage reports failure through [`StackupError`]. The variants map onto
//! four operator-facing categories (see [`ErrorCategory`]) which decide how the
//! driver words its final failure message.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::ProvisionStep;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum StackupError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// The container runtime or the compose tool is missing or unresponsive.
    #[error("{tool} is unavailable: {cause}")]
    Unavailable {
        /// Tool that failed the check.
        tool: String,
        /// Human-readable cause.
        cause: String,
    },

    /// The environment template needed to materialize configuration is absent.
    #[error("environment template not found: {}", path.display())]
    MissingTemplate {
        /// Expected template location.
        path: PathBuf,
    },

    /// An external command exited unsuccessfully.
    #[error("command `{command}` failed with exit code {code}{}", stderr_suffix(stderr))]
    CommandFailed {
        /// Rendered command line.
        command: String,
        /// Exit code (-1 when terminated by a signal).
        code: i32,
        /// Captured standard error, if any.
        stderr: String,
    },

    /// The stack did not report any running service after launch.
    #[error("stack failed to start: {message}")]
    LaunchFailure {
        /// Description of what was observed.
        message: String,
    },

    /// A bounded probe exhausted its attempts.
    #[error("{what} not ready after {attempts} attempts")]
    Timeout {
        /// What was being waited for.
        what: String,
        /// Number of attempts performed.
        attempts: u32,
    },

    /// A provisioning sub-stage failed.
    #[error("provisioning failed during {step}: {source}")]
    Provisioning {
        /// Sub-stage that failed.
        step: ProvisionStep,
        /// Originating error.
        source: Box<StackupError>,
    },

    /// An HTTP request could not be completed.
    #[error("HTTP request to {url} failed: {message}")]
    Http {
        /// Requested URL.
        url: String,
        /// Transport-level failure description.
        message: String,
    },

    /// The run was interrupted by the operator.
    #[error("interrupted")]
    Interrupted,

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// Operator-facing classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Host problem: missing runtime, tool, or template. Fix the host and rerun.
    Environment,
    /// The stack did not come up.
    Launch,
    /// A dependency never became ready.
    Readiness,
    /// Migration, account creation, seeding, or static publication failed.
    Provisioning,
    /// Operator cancelled the run.
    Interrupted,
    /// Anything else (I/O, configuration, serialization).
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Environment => write!(f, "environment"),
            Self::Launch => write!(f, "launch"),
            Self::Readiness => write!(f, "readiness"),
            Self::Provisioning => write!(f, "provisioning"),
            Self::Interrupted => write!(f, "interrupted"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

impl StackupError {
    /// Returns the category this error belongs to.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Unavailable { .. } | Self::MissingTemplate { .. } => ErrorCategory::Environment,
            Self::LaunchFailure { .. } => ErrorCategory::Launch,
            Self::Timeout { .. } => ErrorCategory::Readiness,
            Self::Provisioning { .. } => ErrorCategory::Provisioning,
            Self::Interrupted => ErrorCategory::Interrupted,
            Self::Io { .. }
            | Self::Config { .. }
            | Self::NotFound { .. }
            | Self::CommandFailed { .. }
            | Self::Http { .. }
            | Self::Serialization { .. } => ErrorCategory::Internal,
        }
    }

    /// Wraps this error as the cause of a failed provisioning sub-stage.
    ///
    /// An error that is already a provisioning failure, or an interruption,
    /// is returned unchanged.
    #[must_use]
    pub fn in_step(self, step: ProvisionStep) -> Self {
        match self {
            Self::Provisioning { .. } | Self::Interrupted => self,
            other => Self::Provisioning {
                step,
                source: Box::new(other),
            },
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, StackupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failed_includes_trimmed_stderr() {
        let err = StackupError::CommandFailed {
            command: "docker info".into(),
            code: 1,
            stderr: "  cannot connect\n".into(),
        };
        assert_eq!(
            err.to_string(),
            "command `docker info` failed with exit code 1: cannot connect"
        );
    }

    #[test]
    fn command_failed_without_stderr_has_no_suffix() {
        let err = StackupError::CommandFailed {
            command: "true".into(),
            code: 2,
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "command `true` failed with exit code 2");
    }

    #[test]
    fn in_step_wraps_once() {
        let err = StackupError::Config {
            message: "x".into(),
        }
        .in_step(ProvisionStep::Seed)
        .in_step(ProvisionStep::Static);
        assert!(matches!(
            err,
            StackupError::Provisioning {
                step: ProvisionStep::Seed,
                ..
            }
        ));
        assert_eq!(err.category(), ErrorCategory::Provisioning);
    }

    #[test]
    fn in_step_leaves_interruption_alone() {
        let err = StackupError::Interrupted.in_step(ProvisionStep::Migrate);
        assert_eq!(err.category(), ErrorCategory::Interrupted);
    }

    #[test]
    fn categories_follow_taxonomy() {
        assert_eq!(
            StackupError::MissingTemplate {
                path: "env.example".into()
            }
            .category(),
            ErrorCategory::Environment
        );
        assert_eq!(
            StackupError::Timeout {
                what: "database".into(),
                attempts: 30
            }
            .category(),
            ErrorCategory::Readiness
        );
        assert_eq!(
            StackupError::LaunchFailure {
                message: "none running".into()
            }
            .category(),
            ErrorCategory::Launch
        );
    }
}
