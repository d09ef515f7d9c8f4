//! Application provisioning inside the running app service.
//!
//! The orchestrator runs the sub-steps in [`ProvisionStep::ORDER`] and
//! stops at the first failure. Every command is re-runnable: migrations
//! and fixture loads are idempotent in the application, and the account
//! step checks for an existing account before creating one.

use stackup_common::config::ProvisioningConfig;
use stackup_common::constants::ACCOUNT_ABSENT_EXIT;
use stackup_common::error::{Result, StackupError};
use stackup_common::types::{Credential, ProvisionStep, SeedDataSet};
use stackup_runtime::compose::Compose;
use stackup_runtime::runner::{CommandRunner, Invocation, run_checked};

use crate::console::Console;
use crate::state::AccountOutcome;

const ACCOUNT_NAME_VAR: &str = "STACKUP_ACCOUNT_NAME";
const ACCOUNT_SECRET_VAR: &str = "DJANGO_SUPERUSER_PASSWORD";

/// Exits 0 when the named account exists and [`ACCOUNT_ABSENT_EXIT`] when
/// it does not. The name arrives through the environment, never inlined.
fn account_probe_script() -> String {
    format!(
        "import os, sys; from django.contrib.auth import get_user_model; \
         sys.exit(0 if get_user_model().objects.filter(username=os.environ['{ACCOUNT_NAME_VAR}']).exists() else {ACCOUNT_ABSENT_EXIT})"
    )
}

/// Runs management commands in the app service.
pub struct Provisioner<'a> {
    compose: &'a Compose,
    app_service: &'a str,
    config: &'a ProvisioningConfig,
    runner: &'a dyn CommandRunner,
    console: &'a Console,
}

impl<'a> Provisioner<'a> {
    /// Creates a provisioner targeting `app_service`.
    #[must_use]
    pub fn new(
        compose: &'a Compose,
        app_service: &'a str,
        config: &'a ProvisioningConfig,
        runner: &'a dyn CommandRunner,
        console: &'a Console,
    ) -> Self {
        Self {
            compose,
            app_service,
            config,
            runner,
            console,
        }
    }

    fn manage<I>(&self, args: I, env: &[(String, String)]) -> Invocation
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let argv: Vec<String> = self
            .config
            .manage
            .iter()
            .cloned()
            .chain(args.into_iter().map(Into::into))
            .collect();
        self.compose.exec(self.app_service, &argv, env)
    }

    fn checked(&self, step: ProvisionStep, invocation: &Invocation) -> Result<()> {
        tracing::info!(%step, command = %invocation, "provisioning");
        run_checked(self.runner, invocation)
            .map(drop)
            .map_err(|e| e.in_step(step))
    }

    /// Generates pending migrations, then applies them.
    ///
    /// # Errors
    ///
    /// Returns [`StackupError::Provisioning`] for [`ProvisionStep::Migrate`].
    pub fn migrate(&self) -> Result<()> {
        self.console.info("Running database migrations...");
        self.checked(ProvisionStep::Migrate, &self.manage(["makemigrations"], &[]))?;
        self.checked(ProvisionStep::Migrate, &self.manage(["migrate"], &[]))?;
        self.console.success("Migrations completed");
        Ok(())
    }

    /// Creates the bootstrap account unless one with the same name exists.
    ///
    /// An existing account is never modified.
    ///
    /// # Errors
    ///
    /// Returns [`StackupError::Provisioning`] for [`ProvisionStep::Account`]
    /// if the lookup or creation fails.
    pub fn ensure_account(&self, credential: &Credential) -> Result<AccountOutcome> {
        self.console.info("Creating superuser...");
        let lookup = self.manage(
            ["shell".to_string(), "-c".to_string(), account_probe_script()],
            &[(ACCOUNT_NAME_VAR.into(), credential.name.clone())],
        );
        tracing::info!(step = %ProvisionStep::Account, account = %credential.name, "checking for existing account");
        let out = self
            .runner
            .run(&lookup)
            .map_err(|e| e.in_step(ProvisionStep::Account))?;

        match out.exit_code {
            0 => {
                self.console
                    .success(format!("Superuser '{}' already exists", credential.name));
                Ok(AccountOutcome::AlreadyPresent)
            }
            ACCOUNT_ABSENT_EXIT => {
                let create = self.manage(
                    [
                        "createsuperuser",
                        "--noinput",
                        "--username",
                        credential.name.as_str(),
                        "--email",
                        credential.email.as_str(),
                    ],
                    &[(ACCOUNT_SECRET_VAR.into(), credential.secret.clone())],
                );
                self.checked(ProvisionStep::Account, &create)?;
                self.console
                    .success(format!("Superuser '{}' created", credential.name));
                Ok(AccountOutcome::Created)
            }
            code => Err(StackupError::CommandFailed {
                command: lookup.command_line(),
                code,
                stderr: out.stderr,
            }
            .in_step(ProvisionStep::Account)),
        }
    }

    /// Loads each fixture in order, stopping at the first failure.
    ///
    /// Returns the number of fixtures loaded.
    ///
    /// # Errors
    ///
    /// Returns [`StackupError::Provisioning`] for [`ProvisionStep::Seed`].
    pub fn load_seed(&self, seeds: &SeedDataSet) -> Result<usize> {
        self.console.info("Loading initial data...");
        let mut loaded = 0;
        for fixture in seeds.iter() {
            self.checked(ProvisionStep::Seed, &self.manage(["loaddata", fixture], &[]))?;
            loaded += 1;
        }
        self.console
            .success(format!("Loaded {loaded} fixture file(s)"));
        Ok(loaded)
    }

    /// Publishes static assets, optionally clearing previous output first.
    ///
    /// # Errors
    ///
    /// Returns [`StackupError::Provisioning`] for [`ProvisionStep::Static`].
    pub fn publish_static(&self, clear: bool) -> Result<()> {
        self.console.info("Collecting static files...");
        let mut args = vec!["collectstatic", "--noinput"];
        if clear {
            args.push("--clear");
        }
        self.checked(ProvisionStep::Static, &self.manage(args, &[]))?;
        self.console.success("Static files collected");
        Ok(())
    }
}
