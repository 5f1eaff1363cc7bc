#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Sitegauge - backend glue for a self-hosted web analytics dashboard
//!
//! Sitegauge makes sure the analytics database is ready before the dashboard
//! starts, keeps the embedded (SQLite) deployment mode in line with the server
//! databases, and generates the tracking snippets site owners embed. It can be
//! used as both a command-line application and a library.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | `display` | Table formatting with `tabled` | `tabled` |
//! | `cli` | `sitegauge` and `check-db` binaries | All above + `clap`, `tracing-subscriber` |
//!
//! Database drivers (`rusqlite`, `sqlx`) and the remote provider client
//! (`ureq`) are always available.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - **[`check`]**: the startup readiness sequence
//!   - `version`: minimum server version gate
//!   - `legacy`: detection of pre-v2 migration history
//!   - `migrate` / `remote_migrate`: applying pending migrations
//!
//! - **[`database`]**: all database functionality
//!   - `core`: family classification, SQLite and server handles
//!   - `dialect`: per-family timestamp and bulk-insert behavior
//!   - `remote`: hosted SQLite provider over HTTP
//!   - `maintenance`: `VACUUM` for the embedded database
//!
//! - **[`lens`]**: tracking snippet generation and output formats
//!
//! - **[`config`]**: configuration management
//!
//! # Quick Start Examples
//!
//! ## Readiness checks
//!
//! ```rust,ignore
//! use sitegauge::check::{run_checks, StdoutReporter};
//! use sitegauge::AppConfig;
//!
//! let config = AppConfig::new(&None)?;
//! let outcome = run_checks(&config, &mut StdoutReporter);
//! std::process::exit(outcome.exit_code());
//! ```
//!
//! ## Dialect selection
//!
//! ```rust,ignore
//! use sitegauge::{AppConfig, AppContext};
//!
//! let context = AppContext::new(AppConfig::new(&None)?);
//! if let Some(dialect) = context.dialect() {
//!     let created_at = dialect.db_date(chrono::Utc::now());
//! }
//! ```
//!
//! ## Tracking code
//!
//! ```rust,ignore
//! use sitegauge::lens::tracking::{TrackingCodeArgs, TrackingCodeLens, TrackingLanguage};
//!
//! let args = TrackingCodeArgs::new("b59e9c65-ae32-47f1-8400-119fcf4861c4")
//!     .with_host_url("https://analytics.example.com");
//! let html = TrackingCodeLens::new(&args).generate(TrackingLanguage::Html);
//! ```

pub mod check;
pub mod config;
pub mod database;
pub mod lens;

// =============================================================================
// Configuration
// =============================================================================

pub use config::{format_size, mask_url_password, AppConfig, AppContext, ConfigEntry};

// =============================================================================
// Readiness checks
// =============================================================================

pub use check::{
    run_checks, CheckError, Reporter, SequenceOutcome, Sequencer, StdoutReporter, Step,
    StepResult,
};

// =============================================================================
// Database
// =============================================================================

pub use database::{
    dialect_for, vacuum, Connector, DatabaseConn, DatabaseFamily, DatabaseHandle,
    DefaultConnector, Dialect, HranaClient, RemoteClient, VacuumReport,
};

// =============================================================================
// Lenses
// =============================================================================

pub use lens::tracking::{TrackingCodeArgs, TrackingCodeLens, TrackingLanguage, TrackingSnippet};
pub use lens::utils::OutputFormat;
