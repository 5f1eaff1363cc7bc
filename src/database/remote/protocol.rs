//! Wire types for the remote provider's HTTP pipeline API

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct PipelineRequest {
    pub requests: Vec<StreamRequest>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamRequest {
    Execute { stmt: Stmt },
    Batch { batch: Batch },
    Close,
}

#[derive(Debug, Serialize)]
pub struct Stmt {
    pub sql: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Arg>,
}

impl Stmt {
    pub fn new(sql: &str, args: &[&str]) -> Self {
        Self {
            sql: sql.to_string(),
            args: args
                .iter()
                .map(|a| Arg::Text {
                    value: a.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Arg {
    Text { value: String },
}

#[derive(Debug, Serialize)]
pub struct Batch {
    pub steps: Vec<BatchStep>,
}

#[derive(Debug, Serialize)]
pub struct BatchStep {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<BatchCond>,
    pub stmt: Stmt,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchCond {
    Ok { step: usize },
}

impl Batch {
    /// A batch where every step only runs if the previous one succeeded
    pub fn chained(statements: &[String]) -> Self {
        let steps = statements
            .iter()
            .enumerate()
            .map(|(i, sql)| BatchStep {
                condition: i.checked_sub(1).map(|step| BatchCond::Ok { step }),
                stmt: Stmt::new(sql, &[]),
            })
            .collect();
        Self { steps }
    }
}

#[derive(Debug, Deserialize)]
pub struct PipelineResponse {
    pub results: Vec<StreamResult>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamResult {
    Ok { response: StreamResponse },
    Error { error: RemoteError },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamResponse {
    Execute { result: StmtResult },
    Batch { result: BatchResult },
    Close,
}

#[derive(Debug, Deserialize)]
pub struct StmtResult {
    #[serde(default)]
    pub rows: Vec<Vec<RemoteValue>>,
    #[serde(default)]
    pub affected_row_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct BatchResult {
    #[serde(default)]
    pub step_results: Vec<Option<StmtResult>>,
    #[serde(default)]
    pub step_errors: Vec<Option<RemoteError>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteError {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RemoteValue {
    Null,
    Integer { value: String },
    Float { value: f64 },
    Text { value: String },
    Blob { base64: String },
}

impl RemoteValue {
    /// Text rendering of the value, `None` for SQL NULL
    pub fn into_text(self) -> Option<String> {
        match self {
            RemoteValue::Null => None,
            RemoteValue::Integer { value } | RemoteValue::Text { value } => Some(value),
            RemoteValue::Float { value } => Some(value.to_string()),
            RemoteValue::Blob { base64 } => Some(base64),
        }
    }
}
