//! Database module
//!
//! This module provides all database functionality for sitegauge, organized into:
//!
//! - **core**: connection string classification and live connection handles
//! - **dialect**: per-family timestamp and bulk-insert behavior
//! - **remote**: HTTP client for hosted embedded databases
//! - **maintenance**: embedded database upkeep (`VACUUM`)
//!
//! # Architecture
//!
//! ```text
//! database/
//! ├── core/             # Foundation
//! │   ├── family        # DatabaseFamily from a connection string
//! │   ├── connection    # SQLite DatabaseConn wrapper
//! │   ├── handle        # DatabaseHandle / Connector, SQLite handle
//! │   └── server        # PostgreSQL / MySQL handle (sqlx)
//! │
//! ├── dialect           # Dialect strategy selected once per process
//! ├── remote/           # Hosted SQLite over HTTP
//! └── maintenance       # VACUUM
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use sitegauge::database::{dialect_for, DatabaseFamily};
//!
//! let family = DatabaseFamily::from_url("file:./analytics.db").unwrap();
//! let dialect = dialect_for(&family);
//!
//! // Raw queries read millisecond timestamps regardless of the backend
//! let sql = format!("select {} as created_at from website", dialect.raw_date_query("created_at"));
//! ```

pub mod core;
pub mod dialect;
pub mod maintenance;
pub mod remote;

pub use core::{
    resolve_sqlite_path, sqlite_path_from_url, Connector, DatabaseConn, DatabaseFamily,
    DatabaseHandle, DefaultConnector, ServerHandle, SqliteHandle, QUERY_LOG_TARGET,
};
pub use dialect::{
    dialect_for, insert_many, Dialect, InsertStatement, ServerDialect, SqlValue, SqliteDialect,
    UPDATED_AT_MODELS,
};
pub use maintenance::{vacuum, VacuumReport};
pub use remote::{HranaClient, RemoteClient, RemoteRows};
