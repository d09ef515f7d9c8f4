//! System-wide constants and default paths.
//!
//! The probe magnitudes below are compatibility constants: tooling built
//! around the bring-up expects roughly a one-minute database ceiling and a
//! thirty-second smoke ceiling.

/// Configuration file looked up in the project directory.
pub const DEFAULT_CONFIG_FILE: &str = "stackup.yaml";

/// Environment file consumed by the deployed application.
pub const DEFAULT_ENV_FILE: &str = "env.docker";

/// Template the environment file is derived from on first run.
pub const DEFAULT_ENV_TEMPLATE: &str = "env.example";

/// Standalone compose binary.
pub const COMPOSE_STANDALONE_BIN: &str = "docker-compose";

/// Container runtime binary (also hosts the compose plugin).
pub const DOCKER_BIN: &str = "docker";

/// Seconds to wait after `up -d` before querying service status.
pub const DEFAULT_SETTLE_SECS: u64 = 10;

/// Database readiness attempts.
pub const DB_PROBE_MAX_ATTEMPTS: u32 = 30;

/// Seconds between database readiness attempts.
pub const DB_PROBE_INTERVAL_SECS: u64 = 2;

/// Application smoke attempts.
pub const SMOKE_MAX_ATTEMPTS: u32 = 10;

/// Seconds between smoke attempts.
pub const SMOKE_INTERVAL_SECS: u64 = 3;

/// Per-request timeout for the smoke GET.
pub const SMOKE_REQUEST_TIMEOUT_SECS: u64 = 5;

/// Application root probed by the smoke tester.
pub const DEFAULT_APP_URL: &str = "http://localhost:8000/";

/// Development-only bootstrap account name.
pub const DEV_ADMIN_NAME: &str = "admin";

/// Development-only bootstrap account email.
pub const DEV_ADMIN_EMAIL: &str = "admin@admin.com";

/// Development-only bootstrap account secret.
pub const DEV_ADMIN_SECRET: &str = "admin";

/// Exit status the account check uses to report "no such account".
pub const ACCOUNT_ABSENT_EXIT: i32 = 3;
