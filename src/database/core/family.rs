//! Database family classification
//!
//! A connection string's scheme prefix decides which database family the
//! process talks to. Everything that behaves differently per family keys off
//! [`DatabaseFamily`].

use semver::Version;
use serde::Serialize;
use std::fmt;

/// Database family resolved from a connection string
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseFamily {
    Postgresql,
    Mysql,
    /// File-based embedded database
    Sqlite,
    /// Unrecognized scheme, kept verbatim
    Other(String),
}

impl DatabaseFamily {
    /// Classify a connection string by the text before its first `:`
    ///
    /// `postgres` maps to PostgreSQL and `file` maps to SQLite. Any other
    /// scheme passes through unchanged as its own tag.
    pub fn from_url(url: &str) -> Option<DatabaseFamily> {
        let scheme = url.split(':').next()?;
        if scheme.is_empty() {
            return None;
        }

        Some(match scheme {
            "postgres" | "postgresql" => DatabaseFamily::Postgresql,
            "file" | "sqlite" => DatabaseFamily::Sqlite,
            "mysql" => DatabaseFamily::Mysql,
            other => DatabaseFamily::Other(other.to_string()),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            DatabaseFamily::Postgresql => "postgresql",
            DatabaseFamily::Mysql => "mysql",
            DatabaseFamily::Sqlite => "sqlite",
            DatabaseFamily::Other(name) => name.as_str(),
        }
    }

    /// Whether this is the file-based embedded family
    pub fn is_embedded(&self) -> bool {
        matches!(self, DatabaseFamily::Sqlite)
    }

    /// Minimum server version accepted by the version gate
    ///
    /// Embedded databases are always compatible and have no requirement.
    pub fn min_version(&self) -> Option<Version> {
        match self {
            DatabaseFamily::Sqlite => None,
            DatabaseFamily::Postgresql => Some(Version::new(9, 4, 0)),
            _ => Some(Version::new(5, 7, 0)),
        }
    }
}

impl fmt::Display for DatabaseFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
