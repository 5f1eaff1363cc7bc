//! Live database handles
//!
//! The readiness checks only need a few read-only queries, so every family is
//! reduced to the same small [`DatabaseHandle`] surface. A [`Connector`] opens
//! the handle for a connection string; tests inject their own.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::connection::DatabaseConn;
use super::family::DatabaseFamily;
use super::server::ServerHandle;

/// Target used for SQL statement logging when `LOG_QUERY` is set
pub const QUERY_LOG_TARGET: &str = "sitegauge::query";

/// A live connection to one database
pub trait DatabaseHandle {
    /// Family this handle talks to
    fn family(&self) -> &DatabaseFamily;

    /// Run a query returning a single text value (first column, first row)
    fn query_string(&mut self, sql: &str) -> Result<String>;

    /// Run a query returning a single integer count (first column, first row)
    fn query_count(&mut self, sql: &str) -> Result<u64>;

    /// Release the connection
    fn close(self: Box<Self>) -> Result<()>;
}

/// Opens [`DatabaseHandle`]s
pub trait Connector {
    fn connect(&self, url: &str, family: &DatabaseFamily) -> Result<Box<dyn DatabaseHandle>>;
}

/// Connector used by the binaries: SQLite via rusqlite, servers via sqlx
#[derive(Debug, Default, Clone)]
pub struct DefaultConnector {
    pub log_queries: bool,
    /// Base directory for relative SQLite paths
    pub schema_dir: Option<PathBuf>,
}

impl DefaultConnector {
    pub fn new(log_queries: bool) -> Self {
        Self {
            log_queries,
            schema_dir: None,
        }
    }

    pub fn with_schema_dir(mut self, schema_dir: Option<PathBuf>) -> Self {
        self.schema_dir = schema_dir;
        self
    }
}

impl Connector for DefaultConnector {
    fn connect(&self, url: &str, family: &DatabaseFamily) -> Result<Box<dyn DatabaseHandle>> {
        match family {
            DatabaseFamily::Sqlite => Ok(Box::new(SqliteHandle::open(
                url,
                self.schema_dir.as_deref(),
                self.log_queries,
            )?)),
            DatabaseFamily::Postgresql | DatabaseFamily::Mysql => {
                Ok(Box::new(ServerHandle::connect(url, family.clone(), self.log_queries)?))
            }
            DatabaseFamily::Other(name) => Err(anyhow!("unsupported database type '{}'", name)),
        }
    }
}

/// Handle for the embedded (file) family
pub struct SqliteHandle {
    db: DatabaseConn,
    family: DatabaseFamily,
    log_queries: bool,
}

impl SqliteHandle {
    pub fn open(url: &str, schema_dir: Option<&Path>, log_queries: bool) -> Result<Self> {
        let db = DatabaseConn::open_url(url, schema_dir)?;
        // Fail here rather than on the first real query if the file is unreadable
        db.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|e| anyhow!("Failed to verify sqlite connection: {}", e))?;
        Ok(Self::from_conn(db, log_queries))
    }

    pub fn from_conn(db: DatabaseConn, log_queries: bool) -> Self {
        Self {
            db,
            family: DatabaseFamily::Sqlite,
            log_queries,
        }
    }

    fn log(&self, sql: &str) {
        if self.log_queries {
            debug!(target: QUERY_LOG_TARGET, "{}", sql);
        }
    }
}

impl DatabaseHandle for SqliteHandle {
    fn family(&self) -> &DatabaseFamily {
        &self.family
    }

    fn query_string(&mut self, sql: &str) -> Result<String> {
        self.log(sql);
        self.db
            .conn
            .query_row(sql, [], |row| row.get::<_, String>(0))
            .map_err(|e| anyhow!("Query failed: {}", e))
    }

    fn query_count(&mut self, sql: &str) -> Result<u64> {
        self.log(sql);
        let count: i64 = self
            .db
            .conn
            .query_row(sql, [], |row| row.get(0))
            .map_err(|e| anyhow!("Query failed: {}", e))?;
        Ok(count.max(0) as u64)
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.db
            .conn
            .close()
            .map_err(|(_, e)| anyhow!("Failed to close sqlite connection: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_sqlite_handle_queries() {
        let db = DatabaseConn::open_in_memory().unwrap();
        db.execute("CREATE TABLE website (id INTEGER PRIMARY KEY)")
            .unwrap();
        db.execute("INSERT INTO website (id) VALUES (1), (2)")
            .unwrap();

        let mut handle = SqliteHandle::from_conn(db, true);
        assert_eq!(handle.family(), &DatabaseFamily::Sqlite);
        assert_eq!(
            handle.query_count("SELECT COUNT(*) FROM website").unwrap(),
            2
        );
        assert_eq!(handle.query_string("SELECT 'ok'").unwrap(), "ok");
        assert!(handle.query_count("SELECT COUNT(*) FROM missing").is_err());
        assert!(Box::new(handle).close().is_ok());
    }

    #[test]
    fn test_default_connector_opens_sqlite_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analytics.db");
        let url = format!("file:{}", path.display());

        let connector = DefaultConnector::new(false);
        let handle = connector.connect(&url, &DatabaseFamily::Sqlite).unwrap();
        assert!(handle.close().is_ok());
        assert!(path.exists());
    }

    #[test]
    fn test_default_connector_resolves_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        let connector =
            DefaultConnector::new(false).with_schema_dir(Some(dir.path().to_path_buf()));

        let handle = connector
            .connect("file:./analytics.db", &DatabaseFamily::Sqlite)
            .unwrap();
        assert!(handle.close().is_ok());
        assert!(dir.path().join("analytics.db").exists());
    }

    /// Collects formatted log output
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn logged_queries(log_queries: bool) -> String {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let db = DatabaseConn::open_in_memory().unwrap();
            let mut handle = SqliteHandle::from_conn(db, log_queries);
            handle.query_count("SELECT COUNT(*) FROM sqlite_master").unwrap();
        });
        buffer.contents()
    }

    #[test]
    fn test_query_log_enabled() {
        let output = logged_queries(true);
        assert!(output.contains(QUERY_LOG_TARGET));
        assert!(output.contains("SELECT COUNT(*) FROM sqlite_master"));
    }

    #[test]
    fn test_query_log_disabled() {
        let output = logged_queries(false);
        assert!(!output.contains("SELECT COUNT(*) FROM sqlite_master"));
    }

    #[test]
    fn test_default_connector_rejects_unknown_family() {
        let connector = DefaultConnector::default();
        let result = connector.connect(
            "cockroach://localhost",
            &DatabaseFamily::Other("cockroach".to_string()),
        );
        let err = result.err().unwrap();
        assert!(err.to_string().contains("unsupported database type"));
    }
}
