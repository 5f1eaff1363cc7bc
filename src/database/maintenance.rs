//! Embedded database maintenance

use anyhow::{anyhow, Result};
use std::path::Path;
use tracing::info;

use crate::database::core::{resolve_sqlite_path, DatabaseConn, DatabaseFamily};

/// Size of the database file before and after compaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VacuumReport {
    pub size_before: u64,
    pub size_after: u64,
}

impl VacuumReport {
    pub fn reclaimed(&self) -> u64 {
        self.size_before.saturating_sub(self.size_after)
    }
}

/// Run `VACUUM` on the embedded database named by `url`
///
/// Relative paths are resolved against `schema_dir`, like the readiness checks do.
pub fn vacuum(url: &str, schema_dir: Option<&Path>) -> Result<VacuumReport> {
    match DatabaseFamily::from_url(url) {
        Some(DatabaseFamily::Sqlite) => {}
        _ => return Err(anyhow!("vacuum is only supported for sqlite")),
    }

    let path = resolve_sqlite_path(url, schema_dir)?;
    if !path.exists() {
        return Err(anyhow!("database file '{}' does not exist", path.display()));
    }
    let size_before = file_size(&path);

    let db = DatabaseConn::open_url(url, schema_dir)?;
    info!("vacuuming {}", path.display());
    db.execute("VACUUM")?;
    drop(db);

    let report = VacuumReport {
        size_before,
        size_after: file_size(&path),
    };
    info!("vacuum reclaimed {} bytes", report.reclaimed());
    Ok(report)
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vacuum_shrinks_after_delete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analytics.db");
        let url = format!("file:{}", path.display());

        {
            let db = DatabaseConn::open(path.to_str()).unwrap();
            db.execute("CREATE TABLE website_event (payload TEXT)")
                .unwrap();
            let tx = db.transaction().unwrap();
            for _ in 0..2000 {
                tx.execute(
                    "INSERT INTO website_event (payload) VALUES (?1)",
                    ["x".repeat(200)],
                )
                .unwrap();
            }
            tx.commit().unwrap();
            db.execute("DELETE FROM website_event").unwrap();
        }

        let report = vacuum(&url, None).unwrap();
        assert!(report.size_after < report.size_before);
        assert!(report.reclaimed() > 0);
    }

    #[test]
    fn test_vacuum_rejects_server_database() {
        let err = vacuum("postgres://localhost/analytics", None).unwrap_err();
        assert!(err.to_string().contains("only supported for sqlite"));
    }

    #[test]
    fn test_vacuum_relative_path_uses_schema_dir() {
        let dir = tempfile::tempdir().unwrap();
        {
            let db = DatabaseConn::open(dir.path().join("analytics.db").to_str()).unwrap();
            db.execute("CREATE TABLE website (id INTEGER PRIMARY KEY)")
                .unwrap();
        }

        let report = vacuum("file:./analytics.db", Some(dir.path())).unwrap();
        assert!(report.size_after > 0);

        let err = vacuum("file:./missing.db", Some(dir.path())).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
        assert!(!dir.path().join("missing.db").exists());
    }
}
