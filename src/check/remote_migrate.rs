//! Migrations against a remote embedded database provider
//!
//! The provider does not share the migration tool's history table, so every
//! versioned migration directory is checked individually: each known migration
//! has a marker (a table or index that only exists once it ran). A present
//! marker means the migration is skipped, otherwise its statements are sent as
//! one batch.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::error::CheckError;
use crate::config::AppConfig;
use crate::database::RemoteClient;

/// Schema object whose presence proves a migration already ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Table(&'static str),
    Index(&'static str),
}

impl Marker {
    /// `sqlite_master.type` of the marker
    pub fn kind(&self) -> &'static str {
        match self {
            Marker::Table(_) => "table",
            Marker::Index(_) => "index",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Marker::Table(name) | Marker::Index(name) => name,
        }
    }
}

/// Marker of every embedded-database migration, by directory name
pub const MIGRATION_MARKERS: &[(&str, Marker)] = &[
    ("01_init", Marker::Table("website")),
    ("02_report_schema_session_data", Marker::Table("report")),
    (
        "03_metric_performance_index",
        Marker::Index("website_event_website_id_created_at_event_name_idx"),
    ),
    ("04_team_redesign", Marker::Index("team_access_code_key")),
];

pub const MARKER_QUERY: &str = "SELECT name FROM sqlite_master WHERE type = ? AND name = ?";

pub fn marker_for(migration: &str) -> Option<Marker> {
    MIGRATION_MARKERS
        .iter()
        .find(|(name, _)| *name == migration)
        .map(|(_, marker)| *marker)
}

/// Provider URL and auth token, both required once either is set
pub fn remote_credentials(config: &AppConfig) -> Result<(String, String), CheckError> {
    let url = config
        .turso_database_url
        .clone()
        .ok_or_else(|| CheckError::Config("TURSO_DATABASE_URL is not defined.".to_string()))?;
    let token = config
        .turso_auth_token
        .clone()
        .ok_or_else(|| CheckError::Config("TURSO_AUTH_TOKEN is not defined.".to_string()))?;
    Ok((url, token))
}

/// A versioned migration directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationDir {
    pub name: String,
    pub sql_path: PathBuf,
}

/// List versioned migration directories in ascending order
///
/// A versioned directory's name starts with a digit and it contains a
/// `migration.sql` file. Names are zero-padded, so lexical order is version
/// order.
pub fn discover_migrations(dir: &Path) -> Result<Vec<MigrationDir>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        anyhow!(
            "Unable to read migrations directory '{}': {}",
            dir.display(),
            e
        )
    })?;

    let mut migrations: Vec<MigrationDir> = entries
        .flatten()
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            let sql_path = entry.path().join("migration.sql");
            let versioned = name.chars().next().is_some_and(|c| c.is_ascii_digit());
            (versioned && sql_path.is_file()).then_some(MigrationDir { name, sql_path })
        })
        .collect();

    migrations.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(migrations)
}

/// Split a migration script into statements
///
/// Splits on `;` outside quotes and comments. Comments are dropped and
/// fragments with no SQL left are skipped.
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            current.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                current.push(c);
            }
            '-' if chars.peek() == Some(&'-') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        current.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
                current.push(' ');
            }
            ';' => {
                push_statement(&mut statements, &current);
                current.clear();
            }
            _ => current.push(c),
        }
    }
    push_statement(&mut statements, &current);

    statements
}

fn push_statement(statements: &mut Vec<String>, fragment: &str) {
    let trimmed = fragment.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}

/// What happened to one migration directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteMigrationAction {
    /// Marker already present
    Skipped,
    /// Statements executed
    Applied { statements: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMigrationReport {
    pub name: String,
    pub action: RemoteMigrationAction,
}

/// Applies versioned migrations to a remote embedded database
pub struct RemoteMigrator<'a> {
    client: &'a dyn RemoteClient,
    migrations_dir: PathBuf,
}

impl<'a> RemoteMigrator<'a> {
    pub fn new(client: &'a dyn RemoteClient, migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            migrations_dir: migrations_dir.into(),
        }
    }

    /// Whether the marker exists in the remote database
    pub fn marker_present(&self, marker: Marker) -> Result<bool> {
        let rows = self
            .client
            .execute(MARKER_QUERY, &[marker.kind(), marker.name()])?;
        Ok(!rows.is_empty())
    }

    fn should_skip(&self, migration: &MigrationDir) -> bool {
        let Some(marker) = marker_for(&migration.name) else {
            warn!(
                "no marker registered for migration {}, applying it",
                migration.name
            );
            return false;
        };

        match self.marker_present(marker) {
            Ok(present) => present,
            Err(e) => {
                debug!(
                    "marker check for {} failed, treating it as absent: {}",
                    migration.name, e
                );
                false
            }
        }
    }

    /// Apply every migration whose marker is missing, in version order
    pub fn run(&self) -> Result<Vec<RemoteMigrationReport>, CheckError> {
        let migrations = discover_migrations(&self.migrations_dir)
            .map_err(|e| CheckError::Migration(e.to_string()))?;

        let mut reports = Vec::with_capacity(migrations.len());
        for migration in &migrations {
            if self.should_skip(migration) {
                info!("migration {} already applied, skipping", migration.name);
                reports.push(RemoteMigrationReport {
                    name: migration.name.clone(),
                    action: RemoteMigrationAction::Skipped,
                });
                continue;
            }

            let sql = std::fs::read_to_string(&migration.sql_path).map_err(|e| {
                CheckError::Migration(format!(
                    "Unable to read {}: {}",
                    migration.sql_path.display(),
                    e
                ))
            })?;
            let statements = split_statements(&sql);

            info!(
                "applying migration {} ({} statements)",
                migration.name,
                statements.len()
            );
            self.client.batch(&statements).map_err(|e| {
                CheckError::Migration(format!("Migration {} failed: {}", migration.name, e))
            })?;

            reports.push(RemoteMigrationReport {
                name: migration.name.clone(),
                action: RemoteMigrationAction::Applied {
                    statements: statements.len(),
                },
            });
        }

        Ok(reports)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::database::RemoteRows;
    use std::cell::RefCell;
    use std::collections::HashSet;

    /// In-memory provider recording every call
    #[derive(Default)]
    pub(crate) struct FakeRemote {
        pub objects: HashSet<String>,
        pub failing_checks: HashSet<String>,
        pub batches: RefCell<Vec<Vec<String>>>,
        pub checks: RefCell<Vec<String>>,
    }

    impl FakeRemote {
        pub(crate) fn with_objects(names: &[&str]) -> Self {
            Self {
                objects: names.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }
        }
    }

    impl RemoteClient for FakeRemote {
        fn execute(&self, sql: &str, args: &[&str]) -> Result<RemoteRows> {
            assert_eq!(sql, MARKER_QUERY);
            let name = args[1].to_string();
            self.checks.borrow_mut().push(name.clone());
            if self.failing_checks.contains(&name) {
                return Err(anyhow!("network unreachable"));
            }
            if self.objects.contains(&name) {
                Ok(vec![vec![Some(name)]])
            } else {
                Ok(vec![])
            }
        }

        fn batch(&self, statements: &[String]) -> Result<()> {
            self.batches.borrow_mut().push(statements.to_vec());
            Ok(())
        }
    }

    pub(crate) fn write_migrations(dir: &Path) {
        let files = [
            ("01_init", "-- CreateTable\nCREATE TABLE \"website\" (\"id\" TEXT);\nCREATE TABLE \"team\" (\"id\" TEXT);\n"),
            ("02_report_schema_session_data", "CREATE TABLE \"report\" (\"id\" TEXT);"),
            ("03_metric_performance_index", "CREATE INDEX \"website_event_website_id_created_at_event_name_idx\" ON \"website_event\"(\"website_id\");"),
            ("04_team_redesign", "ALTER TABLE \"team\" ADD COLUMN \"access_code\" TEXT;\nCREATE UNIQUE INDEX \"team_access_code_key\" ON \"team\"(\"access_code\");"),
        ];
        for (name, sql) in files {
            let path = dir.join(name);
            std::fs::create_dir_all(&path).unwrap();
            std::fs::write(path.join("migration.sql"), sql).unwrap();
        }
        std::fs::write(dir.join("migration_lock.toml"), "provider = \"sqlite\"").unwrap();
    }

    #[test]
    fn test_marker_lookup() {
        assert_eq!(marker_for("02_report_schema_session_data"), Some(Marker::Table("report")));
        assert_eq!(marker_for("04_team_redesign").unwrap().kind(), "index");
        assert_eq!(marker_for("99_unknown"), None);
    }

    #[test]
    fn test_remote_credentials() {
        let mut config = AppConfig::default();
        config.turso_auth_token = Some("token".to_string());
        let err = remote_credentials(&config).unwrap_err();
        assert_eq!(err.to_string(), "TURSO_DATABASE_URL is not defined.");

        config.turso_database_url = Some("libsql://db.turso.io".to_string());
        config.turso_auth_token = None;
        let err = remote_credentials(&config).unwrap_err();
        assert_eq!(err.to_string(), "TURSO_AUTH_TOKEN is not defined.");

        config.turso_auth_token = Some("token".to_string());
        assert!(remote_credentials(&config).is_ok());
    }

    #[test]
    fn test_discover_sorted_versioned_dirs() {
        let dir = tempfile::tempdir().unwrap();
        write_migrations(dir.path());
        std::fs::create_dir_all(dir.path().join("notes")).unwrap();
        std::fs::create_dir_all(dir.path().join("05_empty")).unwrap();

        let names: Vec<String> = discover_migrations(dir.path())
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "01_init",
                "02_report_schema_session_data",
                "03_metric_performance_index",
                "04_team_redesign"
            ]
        );
    }

    #[test]
    fn test_split_statements() {
        let sql = "-- CreateTable\nCREATE TABLE \"a\" (\"x\" TEXT DEFAULT 'a;b');\n\n/* block; comment */\nINSERT INTO \"a\" VALUES ('it''s');\n-- trailing comment\n";
        assert_eq!(
            split_statements(sql),
            vec![
                "CREATE TABLE \"a\" (\"x\" TEXT DEFAULT 'a;b')".to_string(),
                "INSERT INTO \"a\" VALUES ('it''s')".to_string(),
            ]
        );
        assert!(split_statements("-- only a comment\n").is_empty());
    }

    #[test]
    fn test_present_markers_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_migrations(dir.path());
        let remote = FakeRemote::with_objects(&["website", "report"]);

        let reports = RemoteMigrator::new(&remote, dir.path()).run().unwrap();

        assert_eq!(reports[0].action, RemoteMigrationAction::Skipped);
        assert_eq!(reports[1].action, RemoteMigrationAction::Skipped);
        assert_eq!(
            reports[2].action,
            RemoteMigrationAction::Applied { statements: 1 }
        );
        assert_eq!(
            reports[3].action,
            RemoteMigrationAction::Applied { statements: 2 }
        );

        let batches = remote.batches.borrow();
        assert_eq!(batches.len(), 2);
        assert!(batches[0][0].contains("website_event_website_id_created_at_event_name_idx"));
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write_migrations(dir.path());
        let remote = FakeRemote::with_objects(&[
            "website",
            "report",
            "website_event_website_id_created_at_event_name_idx",
            "team_access_code_key",
        ]);

        let reports = RemoteMigrator::new(&remote, dir.path()).run().unwrap();
        assert!(reports
            .iter()
            .all(|r| r.action == RemoteMigrationAction::Skipped));
        assert!(remote.batches.borrow().is_empty());
    }

    #[test]
    fn test_failed_marker_check_does_not_block_later_dirs() {
        let dir = tempfile::tempdir().unwrap();
        write_migrations(dir.path());
        let mut remote = FakeRemote::with_objects(&["website", "report", "team_access_code_key"]);
        remote.failing_checks.insert("website".to_string());

        let reports = RemoteMigrator::new(&remote, dir.path()).run().unwrap();

        assert_eq!(
            reports[0].action,
            RemoteMigrationAction::Applied { statements: 2 }
        );
        assert_eq!(reports[1].action, RemoteMigrationAction::Skipped);
        assert_eq!(
            reports[2].action,
            RemoteMigrationAction::Applied { statements: 1 }
        );
        assert_eq!(reports[3].action, RemoteMigrationAction::Skipped);
        assert_eq!(remote.checks.borrow().len(), 4);
    }

    #[test]
    fn test_missing_directory_is_migration_error() {
        let remote = FakeRemote::default();
        let err = RemoteMigrator::new(&remote, "/nonexistent/migrations")
            .run()
            .unwrap_err();
        assert!(matches!(err, CheckError::Migration(_)));
    }
}
