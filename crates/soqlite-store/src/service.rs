//! Query service
//!
//! Orchestrates one execution end to end: validate and translate the SOQL
//! text, run the statement, then append the attempt to the history log.
//! Validation failures stop before translation and are not recorded;
//! execution failures are recorded with success = false. Either way the
//! caller gets a structured outcome, never a panic.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;

use soqlite_translate::{translate, Dialect};

use crate::executor::{ColumnDescriptor, QueryExecutor};
use crate::history::{ExecutionRecord, HistoryError, HistoryRecorder};

/// Result envelope for one query request, shaped for the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutcome {
    pub success: bool,
    pub data: Vec<serde_json::Map<String, serde_json::Value>>,
    pub columns: Vec<ColumnDescriptor>,
    pub record_count: usize,
    pub execution_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryOutcome {
    fn failure(error: String, sql_query: Option<String>, execution_time_ms: u64) -> Self {
        Self {
            success: false,
            data: Vec::new(),
            columns: Vec::new(),
            record_count: 0,
            execution_time_ms,
            sql_query,
            error: Some(error),
        }
    }
}

/// Stateless request-response front for the execution pipeline. Cloning is
/// cheap; concurrent calls share nothing but the database file.
#[derive(Debug, Clone)]
pub struct QueryService {
    executor: QueryExecutor,
    history: HistoryRecorder,
    dialect: Dialect,
}

impl QueryService {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        let db_path: PathBuf = db_path.as_ref().to_path_buf();
        Self {
            executor: QueryExecutor::new(&db_path),
            history: HistoryRecorder::new(&db_path),
            dialect: Dialect::Sqlite,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.executor = self.executor.with_timeout(timeout);
        self
    }

    /// Execute one SOQL query.
    pub fn execute(&self, soql: &str) -> QueryOutcome {
        tracing::info!(query = soql, "executing SOQL query");

        let statement = match translate(soql, self.dialect) {
            Ok(statement) => statement,
            Err(err) => {
                tracing::warn!(error = %err, "query failed validation");
                return QueryOutcome::failure(err.to_string(), None, 0);
            }
        };

        let started = Instant::now();
        match self.executor.execute(&statement) {
            Ok(result) => {
                let record_count = result.rows.len();
                self.history.record(
                    soql,
                    &statement.sql,
                    result.elapsed_ms,
                    record_count,
                    true,
                    None,
                );
                tracing::info!(
                    rows = record_count,
                    elapsed_ms = result.elapsed_ms,
                    "query executed"
                );
                QueryOutcome {
                    success: true,
                    data: result.rows,
                    columns: result.columns,
                    record_count,
                    execution_time_ms: result.elapsed_ms,
                    sql_query: Some(statement.sql),
                    error: None,
                }
            }
            Err(err) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                let message = err.to_string();
                tracing::error!(error = %message, "query execution failed");
                self.history
                    .record(soql, &statement.sql, elapsed_ms, 0, false, Some(&message));
                QueryOutcome::failure(message, Some(statement.sql), elapsed_ms)
            }
        }
    }

    /// Recent execution records, newest first.
    pub fn history(&self, top: usize) -> Result<Vec<ExecutionRecord>, HistoryError> {
        self.history.list(top)
    }
}
