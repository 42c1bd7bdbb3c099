//! Execution history log
//!
//! Appends one record per execution attempt for audit and debugging.
//! Recording is fire-and-forget: a failed write is logged and swallowed,
//! never surfaced to the caller whose query already completed. Records are
//! append-only; retention is an external concern.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use thiserror::Error;

/// Default cap for the history read path.
pub const DEFAULT_HISTORY_TOP: usize = 20;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid timestamp in history row: {0}")]
    Timestamp(#[from] chrono::ParseError),
}

/// One logged execution attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub id: i64,
    pub soql_query: String,
    pub sql_query: String,
    pub execution_time_ms: i64,
    pub record_count: i64,
    pub executed_at: DateTime<Utc>,
    pub success: bool,
    pub error_message: Option<String>,
}

/// Appends and reads execution records in the backing database.
#[derive(Debug, Clone)]
pub struct HistoryRecorder {
    db_path: PathBuf,
}

impl HistoryRecorder {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// Record one execution attempt. Best-effort: failures are logged and
    /// swallowed so they cannot overturn the already-computed result.
    pub fn record(
        &self,
        soql_query: &str,
        sql_query: &str,
        execution_time_ms: u64,
        record_count: usize,
        success: bool,
        error_message: Option<&str>,
    ) {
        if let Err(err) = self.try_record(
            soql_query,
            sql_query,
            execution_time_ms,
            record_count,
            success,
            error_message,
        ) {
            tracing::error!(error = %err, "failed to record query execution");
        }
    }

    fn try_record(
        &self,
        soql_query: &str,
        sql_query: &str,
        execution_time_ms: u64,
        record_count: usize,
        success: bool,
        error_message: Option<&str>,
    ) -> Result<(), HistoryError> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO query_execution_log
                 (soql_query, sql_query, execution_time_ms, record_count,
                  executed_at, success, error_message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                soql_query,
                sql_query,
                execution_time_ms as i64,
                record_count as i64,
                Utc::now().to_rfc3339(),
                success,
                error_message,
            ],
        )?;
        Ok(())
    }

    /// Most recent execution records, newest first, capped at `top`.
    pub fn list(&self, top: usize) -> Result<Vec<ExecutionRecord>, HistoryError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT id, soql_query, sql_query, execution_time_ms, record_count,
                    executed_at, success, error_message
             FROM query_execution_log
             ORDER BY executed_at DESC, id DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map([top as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, bool>(6)?,
                row.get::<_, Option<String>>(7)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, soql_query, sql_query, execution_time_ms, record_count, executed_at, success, error_message) =
                row?;
            records.push(ExecutionRecord {
                id,
                soql_query,
                sql_query,
                execution_time_ms,
                record_count,
                executed_at: DateTime::parse_from_rfc3339(&executed_at)?.with_timezone(&Utc),
                success,
                error_message,
            });
        }
        Ok(records)
    }

    fn open(&self) -> Result<Connection, rusqlite::Error> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS query_execution_log (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 soql_query TEXT NOT NULL,
                 sql_query TEXT NOT NULL,
                 execution_time_ms INTEGER NOT NULL,
                 record_count INTEGER NOT NULL,
                 executed_at TEXT NOT NULL,
                 success INTEGER NOT NULL,
                 error_message TEXT
             );",
        )?;
        Ok(conn)
    }
}
