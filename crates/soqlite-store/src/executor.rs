//! Query execution against SQLite
//!
//! Owns the lifecycle of a single execution: a scoped connection is opened
//! per statement and released on every exit path, success or failure. A
//! watchdog thread interrupts statements that exceed the configured
//! timeout, so a runaway query surfaces as a timeout error instead of a
//! hang.

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;

use soqlite_translate::RewrittenStatement;

/// Default bounded execution timeout.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Query timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Name and store-level type of one result column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: String,
}

/// Fully materialized result of one execution.
#[derive(Debug)]
pub struct ResultSet {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
    /// Wall-clock time from statement submission to full materialization.
    pub elapsed_ms: u64,
}

/// Executes rewritten statements against a SQLite database file.
///
/// Connections are opened per execution and never pooled; concurrent
/// executions coordinate only through SQLite's own locking.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    db_path: PathBuf,
    timeout: Duration,
}

impl QueryExecutor {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run a rewritten statement and materialize the full result set.
    pub fn execute(&self, statement: &RewrittenStatement) -> Result<ResultSet, ExecutionError> {
        let conn = Connection::open(&self.db_path)?;

        // Watchdog: interrupt the statement if it outlives the timeout.
        // The sender fires as soon as materialization finishes.
        let interrupt = conn.get_interrupt_handle();
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let timeout = self.timeout;
        let watchdog = thread::spawn(move || {
            if done_rx.recv_timeout(timeout).is_err() {
                interrupt.interrupt();
            }
        });

        // Telemetry covers statement submission to full materialization,
        // not connection acquisition.
        let started = Instant::now();
        let result = read_all(&conn, &statement.sql);
        let _ = done_tx.send(());
        let _ = watchdog.join();
        drop(conn);

        let mut result_set = result.map_err(|err| map_store_error(err, timeout))?;
        result_set.elapsed_ms = started.elapsed().as_millis() as u64;
        Ok(result_set)
    }
}

fn map_store_error(err: rusqlite::Error, timeout: Duration) -> ExecutionError {
    match &err {
        rusqlite::Error::SqliteFailure(cause, _)
            if cause.code == rusqlite::ErrorCode::OperationInterrupted =>
        {
            ExecutionError::Timeout(timeout)
        }
        _ => ExecutionError::Database(err),
    }
}

fn read_all(conn: &Connection, sql: &str) -> Result<ResultSet, rusqlite::Error> {
    let mut stmt = conn.prepare(sql)?;

    let column_names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let declared_types: Vec<Option<String>> = stmt
        .columns()
        .iter()
        .map(|c| c.decl_type().map(|t| t.to_uppercase()))
        .collect();

    // Columns without a declared type (expressions, for instance) fall back
    // to the storage class of the first non-null value seen.
    let mut observed_types: Vec<Option<&'static str>> = vec![None; column_names.len()];

    let mut out_rows = Vec::new();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mut object = serde_json::Map::with_capacity(column_names.len());
        for (i, name) in column_names.iter().enumerate() {
            let value = row.get_ref(i)?;
            if observed_types[i].is_none() {
                observed_types[i] = storage_class(&value);
            }
            object.insert(name.clone(), value_to_json(value));
        }
        out_rows.push(object);
    }

    let columns = column_names
        .into_iter()
        .zip(declared_types)
        .zip(observed_types)
        .map(|((name, declared), observed)| ColumnDescriptor {
            name,
            data_type: declared
                .or_else(|| observed.map(str::to_string))
                .unwrap_or_else(|| "TEXT".to_string()),
        })
        .collect();

    Ok(ResultSet {
        columns,
        rows: out_rows,
        elapsed_ms: 0,
    })
}

fn storage_class(value: &ValueRef<'_>) -> Option<&'static str> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(_) => Some("INTEGER"),
        ValueRef::Real(_) => Some("REAL"),
        ValueRef::Text(_) => Some("TEXT"),
        ValueRef::Blob(_) => Some("BLOB"),
    }
}

/// Convert a store value to JSON. The store's null marker becomes a
/// language-level null, never the literal string "null".
fn value_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::json!(i),
        ValueRef::Real(f) => serde_json::json!(f),
        ValueRef::Text(s) => serde_json::Value::String(String::from_utf8_lossy(s).to_string()),
        ValueRef::Blob(b) => serde_json::Value::String(format!("<blob {} bytes>", b.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soqlite_translate::{translate, Dialect, PagingStrategy};

    fn seeded_db() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE Account (
                 Id TEXT PRIMARY KEY NOT NULL,
                 Name TEXT,
                 Industry TEXT,
                 AnnualRevenue REAL,
                 NumberOfEmployees INTEGER
             );
             INSERT INTO Account VALUES
                 ('001', 'Acme', 'Tech', 1200.5, 40),
                 ('002', 'Globex', 'Tech', NULL, 900),
                 ('003', 'Initech', 'Finance', 7.25, NULL);",
        )
        .unwrap();
        (dir, path)
    }

    fn run(path: &PathBuf, soql: &str) -> Result<ResultSet, ExecutionError> {
        let statement = translate(soql, Dialect::Sqlite).unwrap();
        QueryExecutor::new(path).execute(&statement)
    }

    #[test]
    fn returns_typed_columns_and_rows() {
        let (_dir, path) = seeded_db();
        let result = run(&path, "SELECT Id, Name, NumberOfEmployees FROM Account ORDER BY Id").unwrap();

        assert_eq!(result.rows.len(), 3);
        let names: Vec<&str> = result.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Id", "Name", "NumberOfEmployees"]);
        assert_eq!(result.columns[0].data_type, "TEXT");
        assert_eq!(result.columns[2].data_type, "INTEGER");

        assert_eq!(result.rows[0]["Name"], serde_json::json!("Acme"));
        assert_eq!(result.rows[0]["NumberOfEmployees"], serde_json::json!(40));
    }

    #[test]
    fn store_null_round_trips_as_json_null() {
        let (_dir, path) = seeded_db();
        let result = run(&path, "SELECT AnnualRevenue FROM Account WHERE Id = '002'").unwrap();

        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0]["AnnualRevenue"], serde_json::Value::Null);
        assert_ne!(result.rows[0]["AnnualRevenue"], serde_json::json!("null"));
    }

    #[test]
    fn where_null_rewrite_matches_missing_values() {
        let (_dir, path) = seeded_db();
        let result = run(&path, "SELECT Id FROM Account WHERE AnnualRevenue = null").unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0]["Id"], serde_json::json!("002"));

        let result = run(&path, "SELECT Id FROM Account WHERE AnnualRevenue != null").unwrap();
        assert_eq!(result.rows.len(), 2);
    }

    #[test]
    fn zero_matching_rows_is_success_not_error() {
        let (_dir, path) = seeded_db();
        let result = run(&path, "SELECT Id FROM Account WHERE Industry = 'Retail'").unwrap();
        assert!(result.rows.is_empty());
        assert!(!result.columns.is_empty());
    }

    #[test]
    fn paging_applies_after_ordering() {
        let (_dir, path) = seeded_db();
        let result = run(&path, "SELECT Id FROM Account ORDER BY Id LIMIT 2 OFFSET 1").unwrap();
        let ids: Vec<_> = result.rows.iter().map(|r| r["Id"].clone()).collect();
        assert_eq!(ids, vec![serde_json::json!("002"), serde_json::json!("003")]);
    }

    #[test]
    fn offset_without_order_by_still_executes() {
        let (_dir, path) = seeded_db();
        let result = run(&path, "SELECT Id FROM Account OFFSET 1").unwrap();
        assert_eq!(result.rows.len(), 2);
    }

    #[test]
    fn missing_table_surfaces_store_error() {
        let (_dir, path) = seeded_db();
        let err = run(&path, "SELECT Id FROM Nonexistent").unwrap_err();
        assert!(matches!(err, ExecutionError::Database(_)));
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn elapsed_is_bounded_by_execution_wall_time() {
        let (_dir, path) = seeded_db();
        let statement = translate("SELECT Id FROM Account", Dialect::Sqlite).unwrap();
        let executor = QueryExecutor::new(&path);

        let wall = Instant::now();
        let result = executor.execute(&statement).unwrap();
        let wall_ms = wall.elapsed().as_millis() as u64;

        // elapsed covers statement run to materialization only, so it can
        // never exceed the wall time of the whole call.
        assert!(result.elapsed_ms <= wall_ms);
    }

    #[test]
    fn runaway_query_times_out() {
        let (_dir, path) = seeded_db();
        // Unbounded recursive CTE, never finishes on its own.
        let statement = RewrittenStatement {
            sql: "WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c) \
                  SELECT count(*) FROM c"
                .to_string(),
            paging: PagingStrategy::None,
        };

        let executor = QueryExecutor::new(&path).with_timeout(Duration::from_millis(300));
        let started = Instant::now();
        let err = executor.execute(&statement).unwrap_err();

        assert!(matches!(err, ExecutionError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(5));

        // The interrupted connection is gone; the file is usable again.
        let result = run(&path, "SELECT Id FROM Account").unwrap();
        assert_eq!(result.rows.len(), 3);
    }

    #[test]
    fn expression_columns_infer_type_from_values() {
        let (_dir, path) = seeded_db();
        let result = run(&path, "SELECT COUNT(Id) FROM Account").unwrap();
        assert_eq!(result.columns[0].data_type, "INTEGER");
        assert_eq!(result.rows.len(), 1);
    }
}
