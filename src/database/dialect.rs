//! Per-family SQL dialect
//!
//! The embedded family stores timestamps as Unix epoch seconds and has no
//! multi-row insert in the ORM layer, while the server families keep native
//! timestamps and accept a single multi-row `INSERT`. Callers pick a
//! [`Dialect`] once with [`dialect_for`] and never branch on the family again.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::{ToSqlOutput, Value};
use rusqlite::ToSql;

use crate::database::core::{DatabaseConn, DatabaseFamily};

/// Models whose `updated_at` column is stamped on every update
pub const UPDATED_AT_MODELS: &[&str] = &["user", "website", "team", "team_user", "report"];

/// A bindable SQL value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Date(DateTime<Utc>),
}

/// A statement and its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

pub trait Dialect: Send + Sync {
    fn family(&self) -> &DatabaseFamily;

    /// How date columns are stored, for display
    fn date_storage(&self) -> &'static str;

    /// Convert a date into the value stored in date columns
    fn db_date(&self, date: DateTime<Utc>) -> SqlValue;

    /// Wrap a date column expression so raw queries yield milliseconds
    fn raw_date_query(&self, expr: &str) -> String;

    /// Convert a stored timestamp into epoch milliseconds, saturating at the `i64` range
    fn read_timestamp(&self, raw: i64) -> i64;

    /// Positional placeholder for the `index`-th parameter (1-based)
    fn placeholder(&self, index: usize) -> String;

    /// Rewrite raw query parameters so dates bind in the stored representation
    fn bind_params(&self, params: Vec<SqlValue>) -> Vec<SqlValue> {
        params
            .into_iter()
            .map(|p| match p {
                SqlValue::Date(d) => self.db_date(d),
                other => other,
            })
            .collect()
    }

    /// Value written to `updated_at` when a row of `model` is updated
    fn updated_at_value(&self, model: &str, now: DateTime<Utc>) -> Option<SqlValue> {
        UPDATED_AT_MODELS
            .contains(&model)
            .then(|| self.db_date(now))
    }

    /// Statements inserting `rows` into `table`
    fn bulk_insert_sql(
        &self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<SqlValue>],
    ) -> Result<Vec<InsertStatement>>;
}

/// Select the dialect for a family
pub fn dialect_for(family: &DatabaseFamily) -> Box<dyn Dialect> {
    match family {
        DatabaseFamily::Sqlite => Box::new(SqliteDialect::default()),
        other => Box::new(ServerDialect::new(other.clone())),
    }
}

fn check_row_widths(columns: &[&str], rows: &[Vec<SqlValue>]) -> Result<()> {
    if columns.is_empty() {
        return Err(anyhow!("Insert requires at least one column"));
    }
    if let Some((i, row)) = rows
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != columns.len())
    {
        return Err(anyhow!(
            "Row {} has {} values but {} columns were given",
            i,
            row.len(),
            columns.len()
        ));
    }
    Ok(())
}

/// Embedded family: epoch-second dates, one `INSERT` per row
#[derive(Debug)]
pub struct SqliteDialect {
    family: DatabaseFamily,
}

impl Default for SqliteDialect {
    fn default() -> Self {
        Self {
            family: DatabaseFamily::Sqlite,
        }
    }
}

impl Dialect for SqliteDialect {
    fn family(&self) -> &DatabaseFamily {
        &self.family
    }

    fn date_storage(&self) -> &'static str {
        "epoch seconds"
    }

    fn db_date(&self, date: DateTime<Utc>) -> SqlValue {
        SqlValue::Integer(date.timestamp_millis().div_euclid(1000))
    }

    fn raw_date_query(&self, expr: &str) -> String {
        format!("{} * 1000", expr)
    }

    fn read_timestamp(&self, raw: i64) -> i64 {
        raw.saturating_mul(1000)
    }

    fn placeholder(&self, index: usize) -> String {
        format!("?{}", index)
    }

    fn bulk_insert_sql(
        &self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<SqlValue>],
    ) -> Result<Vec<InsertStatement>> {
        check_row_widths(columns, rows)?;

        let placeholders = (1..=columns.len())
            .map(|i| self.placeholder(i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders
        );

        Ok(rows
            .iter()
            .map(|row| InsertStatement {
                sql: sql.clone(),
                params: self.bind_params(row.clone()),
            })
            .collect())
    }
}

/// Server families: native dates, a single multi-row `INSERT`
#[derive(Debug)]
pub struct ServerDialect {
    family: DatabaseFamily,
}

impl ServerDialect {
    pub fn new(family: DatabaseFamily) -> Self {
        Self { family }
    }
}

impl Dialect for ServerDialect {
    fn family(&self) -> &DatabaseFamily {
        &self.family
    }

    fn date_storage(&self) -> &'static str {
        "native timestamp"
    }

    fn db_date(&self, date: DateTime<Utc>) -> SqlValue {
        SqlValue::Date(date)
    }

    fn raw_date_query(&self, expr: &str) -> String {
        expr.to_string()
    }

    fn read_timestamp(&self, raw: i64) -> i64 {
        raw
    }

    fn placeholder(&self, index: usize) -> String {
        match self.family {
            DatabaseFamily::Postgresql => format!("${}", index),
            _ => "?".to_string(),
        }
    }

    fn bulk_insert_sql(
        &self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<SqlValue>],
    ) -> Result<Vec<InsertStatement>> {
        check_row_widths(columns, rows)?;
        if rows.is_empty() {
            return Ok(vec![]);
        }

        let mut params = Vec::with_capacity(rows.len() * columns.len());
        let mut tuples = Vec::with_capacity(rows.len());
        for row in rows {
            let start = params.len();
            let tuple = (1..=columns.len())
                .map(|i| self.placeholder(start + i))
                .collect::<Vec<_>>()
                .join(", ");
            tuples.push(format!("({})", tuple));
            params.extend(row.iter().cloned());
        }

        Ok(vec![InsertStatement {
            sql: format!(
                "INSERT INTO {} ({}) VALUES {}",
                table,
                columns.join(", "),
                tuples.join(", ")
            ),
            params,
        }])
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SqlValue::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            SqlValue::Text(s) => ToSqlOutput::Owned(Value::Text(s.clone())),
            SqlValue::Date(d) => ToSqlOutput::Owned(Value::Integer(d.timestamp())),
        })
    }
}

/// Insert many rows into the embedded database
///
/// The embedded driver has no bulk insert, so each row becomes its own
/// statement. All of them run inside one transaction. Returns the number of
/// rows written.
pub fn insert_many(
    db: &DatabaseConn,
    table: &str,
    columns: &[&str],
    rows: &[Vec<SqlValue>],
) -> Result<usize> {
    let statements = SqliteDialect::default().bulk_insert_sql(table, columns, rows)?;
    if statements.is_empty() {
        return Ok(0);
    }

    let tx = db.transaction()?;
    let mut written = 0;
    for statement in &statements {
        written += tx
            .execute(
                &statement.sql,
                rusqlite::params_from_iter(statement.params.iter()),
            )
            .map_err(|e| anyhow!("Failed to insert into {}: {}", table, e))?;
    }
    tx.commit()
        .map_err(|e| anyhow!("Failed to commit inserts into {}: {}", table, e))?;

    Ok(written)
}
