//! Remote embedded database provider
//!
//! Hosted SQLite providers (libSQL servers such as Turso) expose the database
//! over an HTTP pipeline API. [`RemoteClient`] is the small surface the
//! migration applier needs: run one statement, or run a batch that stops at
//! the first failing statement.

mod protocol;

use anyhow::{anyhow, Result};
use tracing::debug;
use url::Url;

use crate::database::core::QUERY_LOG_TARGET;
use protocol::{
    Batch, PipelineRequest, PipelineResponse, Stmt, StreamRequest, StreamResponse, StreamResult,
};

pub use protocol::{RemoteError, RemoteValue};

/// Rows returned by a remote statement, every value rendered as text
pub type RemoteRows = Vec<Vec<Option<String>>>;

pub trait RemoteClient {
    /// Execute one statement with positional text arguments
    fn execute(&self, sql: &str, args: &[&str]) -> Result<RemoteRows>;

    /// Execute statements in order, stopping at the first failure
    fn batch(&self, statements: &[String]) -> Result<()>;
}

/// HTTP client for the provider's `v2/pipeline` endpoint
#[derive(Debug, Clone)]
pub struct HranaClient {
    pipeline_url: String,
    auth_token: String,
    log_queries: bool,
}

impl HranaClient {
    pub fn new(database_url: &str, auth_token: &str) -> Self {
        Self {
            pipeline_url: format!("{}/v2/pipeline", http_base_url(database_url)),
            auth_token: auth_token.to_string(),
            log_queries: false,
        }
    }

    pub fn with_query_log(mut self, log_queries: bool) -> Self {
        self.log_queries = log_queries;
        self
    }

    pub fn pipeline_url(&self) -> &str {
        &self.pipeline_url
    }

    fn send(&self, request: StreamRequest) -> Result<StreamResponse> {
        let body = PipelineRequest {
            requests: vec![request, StreamRequest::Close],
        };

        let response = ureq::post(&self.pipeline_url)
            .header("Authorization", format!("Bearer {}", self.auth_token))
            .header("Content-Type", "application/json")
            .send_json(&body)
            .map_err(|e| anyhow!("Remote database request failed: {}", e))?
            .body_mut()
            .read_json::<PipelineResponse>()
            .map_err(|e| anyhow!("Invalid remote database response: {}", e))?;

        first_response(response)
    }
}

impl RemoteClient for HranaClient {
    fn execute(&self, sql: &str, args: &[&str]) -> Result<RemoteRows> {
        if self.log_queries {
            debug!(target: QUERY_LOG_TARGET, "{}", sql);
        }

        match self.send(StreamRequest::Execute {
            stmt: Stmt::new(sql, args),
        })? {
            StreamResponse::Execute { result } => Ok(result
                .rows
                .into_iter()
                .map(|row| row.into_iter().map(RemoteValue::into_text).collect())
                .collect()),
            other => Err(anyhow!("Unexpected response to execute: {:?}", other)),
        }
    }

    fn batch(&self, statements: &[String]) -> Result<()> {
        if statements.is_empty() {
            return Ok(());
        }
        if self.log_queries {
            for sql in statements {
                debug!(target: QUERY_LOG_TARGET, "{}", sql);
            }
        }

        match self.send(StreamRequest::Batch {
            batch: Batch::chained(statements),
        })? {
            StreamResponse::Batch { result } => {
                if let Some((step, error)) = result
                    .step_errors
                    .into_iter()
                    .enumerate()
                    .find_map(|(i, e)| e.map(|e| (i, e)))
                {
                    return Err(anyhow!(
                        "Statement {} of {} failed: {}",
                        step + 1,
                        statements.len(),
                        error.message
                    ));
                }
                // A skipped step has neither a result nor an error
                let completed = result.step_results.iter().filter(|r| r.is_some()).count();
                if completed != statements.len() {
                    return Err(anyhow!(
                        "Only {} of {} statements completed",
                        completed,
                        statements.len()
                    ));
                }
                Ok(())
            }
            other => Err(anyhow!("Unexpected response to batch: {:?}", other)),
        }
    }
}

/// Map a provider URL to the HTTPS base URL of its API
///
/// Credentials and query parameters (`?authToken=...`) are dropped; a URL
/// without a scheme is taken as an HTTPS host.
pub fn http_base_url(database_url: &str) -> String {
    let trimmed = database_url.trim();
    let parsed = Url::parse(trimmed)
        .ok()
        .filter(|url| url.host_str().is_some())
        .or_else(|| Url::parse(&format!("https://{}", trimmed)).ok());

    let Some(url) = parsed else {
        return trimmed.trim_end_matches('/').to_string();
    };

    let scheme = match url.scheme() {
        "libsql" | "wss" => "https",
        "ws" => "http",
        other => other,
    };
    let port = url.port().map(|p| format!(":{}", p)).unwrap_or_default();

    format!(
        "{}://{}{}{}",
        scheme,
        url.host_str().unwrap_or_default(),
        port,
        url.path().trim_end_matches('/')
    )
}

fn first_response(response: PipelineResponse) -> Result<StreamResponse> {
    match response.results.into_iter().next() {
        Some(StreamResult::Ok { response }) => Ok(response),
        Some(StreamResult::Error { error }) => Err(anyhow!(
            "Remote database error{}: {}",
            error
                .code
                .as_deref()
                .map(|c| format!(" ({})", c))
                .unwrap_or_default(),
            error.message
        )),
        None => Err(anyhow!("Remote database returned no results")),
    }
}
