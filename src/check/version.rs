//! Server version gate

use regex::Regex;
use semver::Version;
use std::sync::OnceLock;

use super::error::CheckError;
use crate::database::{DatabaseFamily, DatabaseHandle};

pub const VERSION_QUERY: &str = "select version() as version";

static VERSION_TOKEN: OnceLock<Option<Regex>> = OnceLock::new();

/// Extract the first `major[.minor[.patch]]` token from a version banner
///
/// Missing components are zero, so `"PostgreSQL 16.2 on x86_64"` reads as
/// `16.2.0` and `"8.0.33-log"` as `8.0.33`.
pub fn parse_version(banner: &str) -> Option<Version> {
    let token = VERSION_TOKEN
        .get_or_init(|| Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?").ok())
        .as_ref()?;
    let caps = token.captures(banner)?;
    let part = |i: usize| -> Option<u64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    Some(Version::new(part(1)?, part(2)?, part(3)?))
}

/// Compare a version banner against the family minimum
pub fn check_banner(banner: &str, family: &DatabaseFamily) -> Result<Version, CheckError> {
    let version = parse_version(banner).ok_or_else(|| {
        CheckError::Version(format!(
            "Unable to determine {} version from '{}'.",
            family, banner
        ))
    })?;

    if let Some(min) = family.min_version() {
        if version < min {
            return Err(CheckError::Version(format!(
                "Database version is not compatible. Please upgrade {} version to {} or greater",
                family, min
            )));
        }
    }
    Ok(version)
}

/// Run the version gate
///
/// Returns `None` for the embedded family, which is always compatible and
/// issues no query.
pub fn check_version(
    handle: &mut dyn DatabaseHandle,
    family: &DatabaseFamily,
) -> Result<Option<Version>, CheckError> {
    if family.is_embedded() {
        return Ok(None);
    }

    let banner = handle.query_string(VERSION_QUERY).map_err(|e| {
        CheckError::Version(format!("Unable to query {} version: {}", family, e))
    })?;

    check_banner(&banner, family).map(Some)
}
