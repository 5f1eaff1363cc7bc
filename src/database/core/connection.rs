//! Embedded database connection management
//!
//! This module provides the SQLite connection wrapper used by the embedded
//! database family.

use anyhow::{anyhow, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Core SQLite connection wrapper
///
/// `DatabaseConn` provides a thin wrapper around SQLite connections,
/// handling both file-based and in-memory databases with consistent
/// configuration and error handling. Unlike a cache database it does not
/// change the journal mode: the file belongs to the analytics application.
pub struct DatabaseConn {
    pub conn: Connection,
}

impl DatabaseConn {
    /// Open a database at the specified path
    ///
    /// If the path is `None`, an in-memory database is created.
    pub fn open(path: Option<&str>) -> Result<Self> {
        let conn = match path {
            Some(p) => Connection::open(p)
                .map_err(|e| anyhow!("Failed to open database at '{}': {}", p, e))?,
            None => Connection::open_in_memory()
                .map_err(|e| anyhow!("Failed to create in-memory database: {}", e))?,
        };

        let db = DatabaseConn { conn };
        db.configure()?;
        Ok(db)
    }

    /// Open the database named by a `file:` connection string
    ///
    /// See [`resolve_sqlite_path`] for how relative paths are located.
    pub fn open_url(url: &str, schema_dir: Option<&Path>) -> Result<Self> {
        let path = resolve_sqlite_path(url, schema_dir)?;
        let path = path
            .to_str()
            .ok_or_else(|| anyhow!("Database path '{}' is not valid UTF-8", path.display()))?;
        Self::open(Some(path))
    }

    /// Create an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::open(None)
    }

    fn configure(&self) -> Result<()> {
        // The application may hold the file open while the checks run
        self.conn
            .busy_timeout(Duration::from_secs(5))
            .map_err(|e| anyhow!("Failed to set busy timeout: {}", e))?;

        self.conn
            .execute("PRAGMA foreign_keys=ON", [])
            .map_err(|e| anyhow!("Failed to enable foreign keys: {}", e))?;

        Ok(())
    }

    /// Execute a SQL statement
    pub fn execute(&self, sql: &str) -> Result<usize> {
        self.conn
            .execute(sql, [])
            .map_err(|e| anyhow!("Failed to execute SQL: {}", e))
    }

    /// Execute a SQL statement with parameters
    pub fn execute_with_params<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<usize> {
        self.conn
            .execute(sql, params)
            .map_err(|e| anyhow!("Failed to execute SQL with params: {}", e))
    }

    /// Begin an unchecked transaction
    pub fn transaction(&self) -> Result<rusqlite::Transaction<'_>> {
        self.conn
            .unchecked_transaction()
            .map_err(|e| anyhow!("Failed to begin transaction: {}", e))
    }
}

/// Extract the file path from a `file:` connection string
///
/// Query parameters (`file:./data.db?connection_limit=1`) are dropped and a
/// `//` authority prefix is tolerated.
pub fn sqlite_path_from_url(url: &str) -> Result<String> {
    let rest = url
        .strip_prefix("file:")
        .or_else(|| url.strip_prefix("sqlite:"))
        .ok_or_else(|| anyhow!("Not a sqlite connection string: '{}'", url))?;

    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let path = rest.split('?').next().unwrap_or_default();

    if path.is_empty() {
        return Err(anyhow!("Missing database file path in '{}'", url));
    }
    Ok(path.to_string())
}

/// Resolve the database file of a `file:` connection string
///
/// Relative paths are taken from `schema_dir` when one is given, which is
/// where the migration tool creates the file.
pub fn resolve_sqlite_path(url: &str, schema_dir: Option<&Path>) -> Result<PathBuf> {
    let path = PathBuf::from(sqlite_path_from_url(url)?);
    Ok(match schema_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = DatabaseConn::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_sqlite_path_from_url() {
        assert_eq!(sqlite_path_from_url("file:./dev.db").unwrap(), "./dev.db");
        assert_eq!(
            sqlite_path_from_url("file:/var/lib/analytics.db?connection_limit=1").unwrap(),
            "/var/lib/analytics.db"
        );
        assert_eq!(
            sqlite_path_from_url("file:///tmp/a.db").unwrap(),
            "/tmp/a.db"
        );
        assert!(sqlite_path_from_url("postgres://localhost/db").is_err());
        assert!(sqlite_path_from_url("file:").is_err());
    }

    #[test]
    fn test_resolve_relative_path_against_schema_dir() {
        let schema_dir = Path::new("/srv/analytics/prisma");
        assert_eq!(
            resolve_sqlite_path("file:./analytics.db", Some(schema_dir)).unwrap(),
            PathBuf::from("/srv/analytics/prisma/analytics.db")
        );
        assert_eq!(
            resolve_sqlite_path("file:/var/lib/analytics.db", Some(schema_dir)).unwrap(),
            PathBuf::from("/var/lib/analytics.db")
        );
        assert_eq!(
            resolve_sqlite_path("file:./analytics.db", None).unwrap(),
            PathBuf::from("./analytics.db")
        );
    }

    #[test]
    fn test_open_url_uses_schema_dir() {
        let dir = tempfile::tempdir().unwrap();
        let db = DatabaseConn::open_url("file:./analytics.db?connection_limit=1", Some(dir.path()))
            .unwrap();
        db.execute("CREATE TABLE website (id INTEGER PRIMARY KEY)")
            .unwrap();
        drop(db);

        assert!(dir.path().join("analytics.db").exists());
    }
}
