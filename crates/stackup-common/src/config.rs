//! Configuration model for a bring-up run.
//!
//! Every field has a default, so an absent or partial `stackup.yaml` still
//! yields a complete configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{Result, StackupError};
use crate::types::{Credential, Endpoint, SeedDataSet, ServiceRole, StackDescriptor};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StackupConfig {
    /// Compose tool selection and manifest location.
    pub compose: ComposeConfig,
    /// Environment file materialization.
    pub environment: EnvironmentConfig,
    /// Declared services and launch settings.
    pub stack: StackConfig,
    /// Database readiness probe.
    pub database: DatabaseConfig,
    /// Provisioning commands.
    pub provisioning: ProvisioningConfig,
    /// Bootstrap administrative account (development-only default).
    pub bootstrap_account: Credential,
    /// Application smoke test.
    pub smoke: SmokeConfig,
    /// Final summary contents.
    pub report: ReportConfig,
}

/// Which compose front-end to drive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComposePreference {
    /// Standalone `docker-compose` if on `PATH`, otherwise the plugin.
    #[default]
    Auto,
    /// Always the standalone `docker-compose` binary.
    Standalone,
    /// Always `docker compose`.
    Plugin,
}

/// Compose tool settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComposeConfig {
    /// Front-end preference.
    pub tool: ComposePreference,
    /// Manifest path passed with `-f`; the tool's own lookup is used when unset.
    pub file: Option<PathBuf>,
    /// Project name passed with `-p`.
    pub project_name: Option<String>,
}

/// Environment file locations, relative to the project directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvironmentConfig {
    /// Concrete environment file.
    pub path: PathBuf,
    /// Template copied when `path` is absent.
    pub template: PathBuf,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(constants::DEFAULT_ENV_FILE),
            template: PathBuf::from(constants::DEFAULT_ENV_TEMPLATE),
        }
    }
}

/// Stack launch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Declared services.
    #[serde(flatten)]
    pub descriptor: StackDescriptor,
    /// Pause after `up -d` before the status check, in seconds.
    pub settle_secs: u64,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            descriptor: StackDescriptor::default(),
            settle_secs: constants::DEFAULT_SETTLE_SECS,
        }
    }
}

impl StackConfig {
    /// Settle pause as a duration.
    #[must_use]
    pub const fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }
}

/// Bounded linear retry parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, at least one.
    pub max_attempts: u32,
    /// Constant pause between attempts, in seconds.
    pub interval_secs: u64,
}

impl RetryPolicy {
    /// Creates a policy.
    #[must_use]
    pub const fn new(max_attempts: u32, interval_secs: u64) -> Self {
        Self {
            max_attempts,
            interval_secs,
        }
    }

    /// Pause between attempts.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Upper bound on time spent sleeping across all attempts. The pause
    /// runs only between attempts, so `n` attempts sleep `n - 1` times.
    #[must_use]
    pub fn ceiling(&self) -> Duration {
        Duration::from_secs(
            self.interval_secs
                .saturating_mul(u64::from(self.max_attempts.saturating_sub(1))),
        )
    }
}

/// Database readiness probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Command run inside the database service; only its exit status matters.
    pub probe: Vec<String>,
    /// Total probe attempts.
    pub max_attempts: u32,
    /// Seconds between attempts.
    pub interval_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            probe: ["pg_isready", "-U", "cvproject_user", "-d", "cvproject"]
                .map(String::from)
                .to_vec(),
            max_attempts: constants::DB_PROBE_MAX_ATTEMPTS,
            interval_secs: constants::DB_PROBE_INTERVAL_SECS,
        }
    }
}

impl DatabaseConfig {
    /// Retry policy for the readiness probe.
    #[must_use]
    pub const fn retry(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.interval_secs)
    }
}

/// Provisioning commands executed inside the application service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisioningConfig {
    /// Management command prefix, e.g. `python manage.py`.
    pub manage: Vec<String>,
    /// Fixtures loaded in order.
    pub fixtures: SeedDataSet,
    /// Clear previously published static assets before collecting.
    pub clear_static: bool,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            manage: vec!["python".into(), "manage.py".into()],
            fixtures: SeedDataSet::new([
                "main/fixtures/initial_data.json",
                "main/fixtures/jane_smith_complete.json",
            ]),
            clear_static: true,
        }
    }
}

/// Application smoke test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SmokeConfig {
    /// URL requested with GET.
    pub url: String,
    /// Total attempts.
    pub max_attempts: u32,
    /// Seconds between attempts.
    pub interval_secs: u64,
    /// Per-request timeout, in seconds.
    pub timeout_secs: u64,
}

impl Default for SmokeConfig {
    fn default() -> Self {
        Self {
            url: constants::DEFAULT_APP_URL.into(),
            max_attempts: constants::SMOKE_MAX_ATTEMPTS,
            interval_secs: constants::SMOKE_INTERVAL_SECS,
            timeout_secs: constants::SMOKE_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl SmokeConfig {
    /// Retry policy for the smoke probe.
    #[must_use]
    pub const fn retry(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.interval_secs)
    }

    /// Per-request timeout as a duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Final summary contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Access points listed after a successful run.
    pub endpoints: Vec<Endpoint>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![
                Endpoint::new("Web Application", "http://localhost:8000"),
                Endpoint::new("Admin Panel", "http://localhost:8000/admin"),
                Endpoint::new("API", "http://localhost:8000/api/"),
                Endpoint::new("Audit", "http://localhost:8000/audit/"),
            ],
        }
    }
}

impl StackupConfig {
    /// Loads configuration.
    ///
    /// An explicit path must exist. Without one, `stackup.yaml` in
    /// `project_dir` is used when present, otherwise the built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(explicit: Option<&Path>, project_dir: &Path) -> Result<Self> {
        let path = match explicit {
            Some(p) if !p.exists() => {
                return Err(StackupError::NotFound {
                    kind: "configuration file",
                    id: p.display().to_string(),
                });
            }
            Some(p) => Some(p.to_path_buf()),
            None => {
                let candidate = project_dir.join(constants::DEFAULT_CONFIG_FILE);
                candidate.exists().then_some(candidate)
            }
        };

        let config = match path {
            Some(path) => {
                let content =
                    std::fs::read_to_string(&path).map_err(|e| StackupError::Io {
                        path: path.clone(),
                        source: e,
                    })?;
                Self::from_yaml(&content).map_err(|e| StackupError::Config {
                    message: format!("{}: {e}", path.display()),
                })?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from YAML text without validating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration document.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| StackupError::Config {
            message: e.to_string(),
        })
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`StackupError::Config`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        let services = &self.stack.descriptor.services;
        if services.is_empty() {
            return Err(invalid("stack must declare at least one service"));
        }
        let count = |role| services.iter().filter(|s| s.role == role).count();
        if count(ServiceRole::Database) != 1 {
            return Err(invalid("stack must declare exactly one database service"));
        }
        if count(ServiceRole::App) == 0 {
            return Err(invalid("stack must declare an app service"));
        }
        if let Some(dup) = services
            .iter()
            .enumerate()
            .find(|(i, s)| services[..*i].iter().any(|o| o.name == s.name))
        {
            return Err(invalid(&format!("service '{}' declared twice", dup.1.name)));
        }
        if self.database.probe.is_empty() {
            return Err(invalid("database.probe must not be empty"));
        }
        if self.provisioning.manage.is_empty() {
            return Err(invalid("provisioning.manage must not be empty"));
        }
        if self.database.max_attempts == 0 || self.smoke.max_attempts == 0 {
            return Err(invalid("max_attempts must be at least 1"));
        }
        if self.bootstrap_account.name.trim().is_empty() {
            return Err(invalid("bootstrap_account.name must not be empty"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> StackupError {
    StackupError::Config {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceiling_counts_pauses_between_attempts() {
        assert_eq!(RetryPolicy::new(5, 2).ceiling(), Duration::from_secs(8));
        assert_eq!(RetryPolicy::new(1, 9).ceiling(), Duration::ZERO);
        assert_eq!(RetryPolicy::new(0, 9).ceiling(), Duration::ZERO);
    }

    #[test]
    fn defaults_are_valid_and_keep_probe_magnitudes() {
        let cfg = StackupConfig::default();
        cfg.validate().expect("defaults validate");
        assert_eq!(cfg.database.retry().ceiling(), Duration::from_secs(58));
        assert_eq!(cfg.smoke.retry().ceiling(), Duration::from_secs(27));
        assert_eq!(cfg.stack.settle(), Duration::from_secs(10));
        assert!(cfg.bootstrap_account.is_development_default());
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let cfg = StackupConfig::from_yaml(
            "database:\n  probe: [true]\n  max_attempts: 5\n  interval_secs: 1\nsmoke:\n  url: http://localhost:9000/\n",
        )
        .expect("parse");
        assert_eq!(cfg.database.retry(), RetryPolicy::new(5, 1));
        assert_eq!(cfg.smoke.url, "http://localhost:9000/");
        assert_eq!(cfg.smoke.max_attempts, constants::SMOKE_MAX_ATTEMPTS);
        assert_eq!(cfg.environment, EnvironmentConfig::default());
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(
            StackupConfig::from_yaml("  \n").expect("parse"),
            StackupConfig::default()
        );
    }

    #[test]
    fn shipped_sample_matches_defaults() {
        let sample = include_str!("../../../stackup.yaml");
        assert_eq!(
            StackupConfig::from_yaml(sample).expect("parse"),
            StackupConfig::default()
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(StackupConfig::from_yaml("colour: blue\n").is_err());
    }

    #[test]
    fn services_can_be_redeclared() {
        let cfg = StackupConfig::from_yaml(
            "stack:\n  services:\n    - {name: app, source: build, role: app}\n    - {name: pg, source: pull, role: database}\n  settle_secs: 0\n",
        )
        .expect("parse");
        cfg.validate().expect("valid");
        assert_eq!(cfg.stack.descriptor.names(), vec!["app", "pg"]);
        assert_eq!(cfg.stack.settle_secs, 0);
    }

    #[test]
    fn validation_requires_single_database() {
        let mut cfg = StackupConfig::default();
        cfg.stack
            .descriptor
            .services
            .retain(|s| s.role != ServiceRole::Database);
        let err = cfg.validate().expect_err("missing database");
        assert!(err.to_string().contains("database"));
    }

    #[test]
    fn validation_rejects_zero_attempts() {
        let mut cfg = StackupConfig::default();
        cfg.smoke.max_attempts = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validation_rejects_duplicate_service() {
        let mut cfg = StackupConfig::default();
        let web = cfg.stack.descriptor.services[0].clone();
        cfg.stack.descriptor.services.push(web);
        let err = cfg.validate().expect_err("duplicate");
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn load_prefers_project_file_then_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = StackupConfig::load(None, dir.path()).expect("defaults");
        assert_eq!(cfg, StackupConfig::default());

        std::fs::write(
            dir.path().join(constants::DEFAULT_CONFIG_FILE),
            "stack:\n  settle_secs: 3\n",
        )
        .expect("write");
        let cfg = StackupConfig::load(None, dir.path()).expect("file");
        assert_eq!(cfg.stack.settle_secs, 3);
    }

    #[test]
    fn load_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.yaml");
        let err = StackupConfig::load(Some(&missing), dir.path()).expect_err("missing");
        assert!(matches!(err, StackupError::NotFound { .. }));
    }
}
