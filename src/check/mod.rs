//! Startup database readiness checks
//!
//! Before the dashboard serves traffic the database must be reachable, recent
//! enough, free of pre-v2 tables and fully migrated. The [`Sequencer`] runs
//! these checks in a fixed order and stops at the first failure.
//!
//! # Architecture
//!
//! ```text
//! check/
//! ├── error            # CheckError taxonomy
//! ├── version          # server version gate
//! ├── legacy           # pre-cutover migration history detector
//! ├── migrate          # migration tool subprocess
//! └── remote_migrate   # marker-based migrations for a hosted SQLite provider
//! ```
//!
//! Every collaborator with side effects sits behind a trait ([`Connector`],
//! [`MigrationRunner`], [`RemoteConnector`], [`Reporter`]) so the sequence can
//! be driven without a live server.
//!
//! # Example
//!
//! ```rust,ignore
//! use sitegauge::check::{run_checks, StdoutReporter};
//! use sitegauge::AppConfig;
//!
//! let config = AppConfig::new(&None)?;
//! let outcome = run_checks(&config, &mut StdoutReporter);
//! std::process::exit(outcome.exit_code());
//! ```

pub mod error;
pub mod legacy;
pub mod migrate;
pub mod remote_migrate;
pub mod version;

use std::fmt;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::database::{
    Connector, DatabaseFamily, DatabaseHandle, DefaultConnector, HranaClient, RemoteClient,
};

pub use error::CheckError;
pub use legacy::check_legacy_tables;
pub use migrate::{CommandRunner, MigrationOutput, MigrationRunner};
pub use remote_migrate::{
    remote_credentials, split_statements, RemoteMigrationAction, RemoteMigrationReport,
    RemoteMigrator,
};
pub use version::{check_version, parse_version};

/// One step of the readiness sequence, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Env,
    Connection,
    Version,
    Legacy,
    Migrate,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::Env,
        Step::Connection,
        Step::Version,
        Step::Legacy,
        Step::Migrate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Step::Env => "environment",
            Step::Connection => "connection",
            Step::Version => "version",
            Step::Legacy => "legacy-tables",
            Step::Migrate => "migrations",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Result of a single step, as reported
#[derive(Debug, Clone, Copy)]
pub enum StepResult<'a> {
    Passed(&'a str),
    /// Step does not apply to this database family
    Skipped,
    Failed(&'a CheckError),
}

impl StepResult<'_> {
    /// Line printed for this result, if any
    pub fn line(&self) -> Option<String> {
        match self {
            StepResult::Passed(message) => Some(format!("✓ {}", message)),
            StepResult::Skipped => None,
            StepResult::Failed(e) => Some(format!("✗ {}", e)),
        }
    }
}

/// Final state of a sequence run
#[derive(Debug)]
pub enum SequenceOutcome {
    /// Every step passed
    Done,
    /// Bypassed with `SKIP_DB_CHECK`
    Skipped,
    Failed { step: Step, error: CheckError },
}

impl SequenceOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            SequenceOutcome::Done | SequenceOutcome::Skipped => 0,
            SequenceOutcome::Failed { .. } => 1,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code() == 0
    }
}

/// Receives the user-visible output of a run
pub trait Reporter {
    fn step(&mut self, step: Step, result: StepResult<'_>);

    /// Free-form output such as the migration tool's stdout
    fn message(&mut self, text: &str);
}

/// Prints check lines to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutReporter;

impl Reporter for StdoutReporter {
    fn step(&mut self, step: Step, result: StepResult<'_>) {
        match result.line() {
            Some(line) => println!("{}", line),
            None => debug!("{} check skipped", step),
        }
    }

    fn message(&mut self, text: &str) {
        println!("{}", text);
    }
}

/// Keeps every line and step in memory
#[derive(Debug, Default, Clone)]
pub struct RecordingReporter {
    pub lines: Vec<String>,
    pub steps: Vec<Step>,
}

impl Reporter for RecordingReporter {
    fn step(&mut self, step: Step, result: StepResult<'_>) {
        self.steps.push(step);
        if let Some(line) = result.line() {
            self.lines.push(line);
        }
    }

    fn message(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }
}

/// Opens clients for the remote embedded database provider
pub trait RemoteConnector {
    fn connect(&self, database_url: &str, auth_token: &str) -> Box<dyn RemoteClient>;
}

/// Connector returning [`HranaClient`]s
#[derive(Debug, Default, Clone)]
pub struct HranaConnector {
    pub log_queries: bool,
}

impl RemoteConnector for HranaConnector {
    fn connect(&self, database_url: &str, auth_token: &str) -> Box<dyn RemoteClient> {
        Box::new(HranaClient::new(database_url, auth_token).with_query_log(self.log_queries))
    }
}

/// Environment step: a connection string must be configured
pub fn check_env(config: &AppConfig) -> Result<&str, CheckError> {
    config
        .database_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| CheckError::Config("DATABASE_URL is not defined.".to_string()))
}

/// Connection step: open a live handle
pub fn check_connection(
    connector: &dyn Connector,
    url: &str,
    family: Option<&DatabaseFamily>,
) -> Result<Box<dyn DatabaseHandle>, CheckError> {
    let unable = |source: Box<dyn std::error::Error + Send + Sync>| CheckError::Connection {
        message: "Unable to connect to the database.".to_string(),
        source,
    };

    let family = family.ok_or_else(|| unable("connection string has no scheme".into()))?;
    connector.connect(url, family).map_err(|e| {
        debug!("connection to {} database failed: {}", family, e);
        unable(e.into())
    })
}

/// Runs the readiness steps in order
pub struct Sequencer<'a> {
    config: &'a AppConfig,
    connector: &'a dyn Connector,
    runner: &'a dyn MigrationRunner,
    remote: &'a dyn RemoteConnector,
}

impl<'a> Sequencer<'a> {
    pub fn new(
        config: &'a AppConfig,
        connector: &'a dyn Connector,
        runner: &'a dyn MigrationRunner,
        remote: &'a dyn RemoteConnector,
    ) -> Self {
        Self {
            config,
            connector,
            runner,
            remote,
        }
    }

    /// Run every step, stopping at the first failure
    ///
    /// The connection handle is released on every path once acquired.
    pub fn run(&self, reporter: &mut dyn Reporter) -> SequenceOutcome {
        if self.config.skip_db_check {
            info!("SKIP_DB_CHECK is set, bypassing database checks");
            reporter.message("Skipping database check.");
            return SequenceOutcome::Skipped;
        }

        let url = match check_env(self.config) {
            Ok(url) => {
                reporter.step(
                    Step::Env,
                    StepResult::Passed("DATABASE_URL is defined."),
                );
                url
            }
            Err(e) => return fail(reporter, Step::Env, e),
        };

        let family = self.config.database_family();
        let mut handle = match check_connection(self.connector, url, family.as_ref()) {
            Ok(handle) => {
                reporter.step(
                    Step::Connection,
                    StepResult::Passed("Database connection successful."),
                );
                handle
            }
            Err(e) => return fail(reporter, Step::Connection, e),
        };

        let result = self.run_with_handle(handle.as_mut(), reporter);

        if let Err(e) = handle.close() {
            warn!("failed to release database connection: {}", e);
        }

        match result {
            Ok(()) => {
                info!("database checks completed");
                SequenceOutcome::Done
            }
            Err((step, e)) => fail(reporter, step, e),
        }
    }

    fn run_with_handle(
        &self,
        handle: &mut dyn DatabaseHandle,
        reporter: &mut dyn Reporter,
    ) -> Result<(), (Step, CheckError)> {
        let family = handle.family().clone();

        match check_version(handle, &family).map_err(|e| (Step::Version, e))? {
            Some(version) => {
                info!("{} server version {}", family, version);
                reporter.step(
                    Step::Version,
                    StepResult::Passed("Database version check successful."),
                );
            }
            None => reporter.step(Step::Version, StepResult::Skipped),
        }

        check_legacy_tables(handle, &family).map_err(|e| (Step::Legacy, e))?;
        reporter.step(
            Step::Legacy,
            StepResult::Passed("No legacy v1 tables detected."),
        );

        self.apply_migrations(&family, reporter)
            .map_err(|e| (Step::Migrate, e))?;
        reporter.step(
            Step::Migrate,
            StepResult::Passed("Database is up to date."),
        );

        Ok(())
    }

    fn apply_migrations(
        &self,
        family: &DatabaseFamily,
        reporter: &mut dyn Reporter,
    ) -> Result<(), CheckError> {
        if family.is_embedded() && self.config.has_remote_provider() {
            let (url, token) = remote_credentials(self.config)?;
            info!("applying migrations to remote database {}", url);
            let client = self.remote.connect(&url, &token);
            let reports =
                RemoteMigrator::new(client.as_ref(), &self.config.migrations_dir).run()?;

            let applied = reports
                .iter()
                .filter(|r| matches!(r.action, RemoteMigrationAction::Applied { .. }))
                .count();
            info!(
                "{} of {} remote migrations applied",
                applied,
                reports.len()
            );
            return Ok(());
        }

        let output = self.runner.apply_pending()?;
        let stdout = output.stdout.trim_end();
        if !stdout.is_empty() {
            reporter.message(stdout);
        }
        Ok(())
    }
}

fn fail(reporter: &mut dyn Reporter, step: Step, e: CheckError) -> SequenceOutcome {
    error!("{} check failed ({}): {}", step, e.kind(), e);
    reporter.step(step, StepResult::Failed(&e));
    SequenceOutcome::Failed { step, error: e }
}

/// Run the sequence with the production collaborators
pub fn run_checks(config: &AppConfig, reporter: &mut dyn Reporter) -> SequenceOutcome {
    let runner = match CommandRunner::from_command_line(&config.migrate_command) {
        Ok(runner) => runner,
        Err(e) => return fail(reporter, Step::Migrate, CheckError::Config(e.to_string())),
    };
    let connector = DefaultConnector::new(config.log_query).with_schema_dir(config.schema_dir());
    let remote = HranaConnector {
        log_queries: config.log_query,
    };

    Sequencer::new(config, &connector, &runner, &remote).run(reporter)
}
