use thiserror::Error;

/// Failure of one readiness step
#[derive(Error, Debug)]
pub enum CheckError {
    /// A required setting is missing
    #[error("{0}")]
    Config(String),

    /// The database is unreachable or rejected the connection
    #[error("{message}")]
    Connection {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The server version is too old or could not be determined
    #[error("{0}")]
    Version(String),

    /// Tables from before the schema cutover are present
    #[error("{0}")]
    LegacySchema(String),

    /// Applying migrations failed
    #[error("{0}")]
    Migration(String),
}

impl CheckError {
    pub fn kind(&self) -> &'static str {
        match self {
            CheckError::Config(_) => "config",
            CheckError::Connection { .. } => "connection",
            CheckError::Version(_) => "version",
            CheckError::LegacySchema(_) => "legacy-schema",
            CheckError::Migration(_) => "migration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_connection_error_keeps_cause() {
        let err = CheckError::Connection {
            message: "Unable to connect to the database.".to_string(),
            source: anyhow::anyhow!("connection refused").into(),
        };
        assert_eq!(err.to_string(), "Unable to connect to the database.");
        assert_eq!(err.source().unwrap().to_string(), "connection refused");
        assert_eq!(err.kind(), "connection");
    }
}
