//! Detection of schemas created before the v2 cutover

use tracing::debug;

use super::error::CheckError;
use crate::database::{DatabaseFamily, DatabaseHandle};

/// Cutover literal for server databases, compared against a timestamp column
pub const SERVER_CUTOVER: &str = "'2023-04-17'";

/// Cutover for the embedded database, in epoch milliseconds
pub const EMBEDDED_CUTOVER_MS: i64 = 1686268800000;

/// Table holding the migration history
pub const MIGRATIONS_TABLE: &str = "_prisma_migrations";

/// Cutover literal for a family, exactly as it is compared in SQL
pub fn cutover_literal(family: &DatabaseFamily) -> String {
    if family.is_embedded() {
        EMBEDDED_CUTOVER_MS.to_string()
    } else {
        SERVER_CUTOVER.to_string()
    }
}

pub fn legacy_query(family: &DatabaseFamily) -> String {
    format!(
        "select count(*) from {} where started_at < {}",
        MIGRATIONS_TABLE,
        cutover_literal(family)
    )
}

/// Fail if the migration history contains records older than the cutover
///
/// A failing query (no history table on a fresh install) means there is
/// nothing to detect.
pub fn check_legacy_tables(
    handle: &mut dyn DatabaseHandle,
    family: &DatabaseFamily,
) -> Result<(), CheckError> {
    match handle.query_count(&legacy_query(family)) {
        Ok(0) => Ok(()),
        Ok(count) => {
            debug!("{} migration records predate the cutover", count);
            Err(CheckError::LegacySchema(
                "Legacy v1 tables detected.".to_string(),
            ))
        }
        Err(e) => {
            debug!("skipping legacy table check: {}", e);
            Ok(())
        }
    }
}
