//! Core database infrastructure
//!
//! This module provides the foundational database components:
//! - `DatabaseFamily`: connection string classification
//! - `DatabaseConn`: SQLite connection wrapper for the embedded family
//! - `DatabaseHandle` / `Connector`: the live-connection surface used by the readiness checks
//! - `ServerHandle`: PostgreSQL and MySQL connections

mod connection;
mod family;
mod handle;
mod server;

pub use connection::{resolve_sqlite_path, sqlite_path_from_url, DatabaseConn};
pub use family::DatabaseFamily;
pub use handle::{Connector, DatabaseHandle, DefaultConnector, SqliteHandle, QUERY_LOG_TARGET};
pub use server::ServerHandle;
