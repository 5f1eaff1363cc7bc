//! Server database handles (PostgreSQL, MySQL)
//!
//! Server families are reached through `sqlx`'s `Any` driver. The readiness
//! checks are strictly sequential, so the handle owns a current-thread tokio
//! runtime and blocks on each query.

use anyhow::{anyhow, Result};
use sqlx::{AnyConnection, Connection, Row};
use tokio::runtime::Runtime;
use tracing::debug;

use super::family::DatabaseFamily;
use super::handle::{DatabaseHandle, QUERY_LOG_TARGET};

pub struct ServerHandle {
    runtime: Runtime,
    conn: AnyConnection,
    family: DatabaseFamily,
    log_queries: bool,
}

impl ServerHandle {
    /// Open and verify a connection to a PostgreSQL or MySQL server
    pub fn connect(url: &str, family: DatabaseFamily, log_queries: bool) -> Result<Self> {
        sqlx::any::install_default_drivers();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| anyhow!("Failed to start database runtime: {}", e))?;

        let mut conn = runtime
            .block_on(AnyConnection::connect(url))
            .map_err(|e| anyhow!("Failed to connect to {}: {}", family, e))?;

        runtime
            .block_on(conn.ping())
            .map_err(|e| anyhow!("Failed to verify {} connection: {}", family, e))?;

        Ok(Self {
            runtime,
            conn,
            family,
            log_queries,
        })
    }

    fn log(&self, sql: &str) {
        if self.log_queries {
            debug!(target: QUERY_LOG_TARGET, "{}", sql);
        }
    }
}

impl DatabaseHandle for ServerHandle {
    fn family(&self) -> &DatabaseFamily {
        &self.family
    }

    fn query_string(&mut self, sql: &str) -> Result<String> {
        self.log(sql);
        let conn = &mut self.conn;
        let row = self
            .runtime
            .block_on(sqlx::query(sql).fetch_one(conn))
            .map_err(|e| anyhow!("Query failed: {}", e))?;
        row.try_get::<String, _>(0)
            .map_err(|e| anyhow!("Unexpected query result: {}", e))
    }

    fn query_count(&mut self, sql: &str) -> Result<u64> {
        self.log(sql);
        let conn = &mut self.conn;
        let row = self
            .runtime
            .block_on(sqlx::query(sql).fetch_one(conn))
            .map_err(|e| anyhow!("Query failed: {}", e))?;
        let count: i64 = row
            .try_get(0)
            .map_err(|e| anyhow!("Unexpected query result: {}", e))?;
        Ok(count.max(0) as u64)
    }

    fn close(self: Box<Self>) -> Result<()> {
        let ServerHandle { runtime, conn, .. } = *self;
        runtime
            .block_on(conn.close())
            .map_err(|e| anyhow!("Failed to close connection: {}", e))
    }
}
