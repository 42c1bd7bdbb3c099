//! Dynamic table provisioning
//!
//! Turns a catalog object into a physical table named after its sanitized
//! API name, with columns named after field API names. Queries referencing
//! an unprovisioned object fail at execution time with the store's
//! "no such table" error, which is the intended surface.

use std::fmt::Write as _;
use std::path::PathBuf;

use rusqlite::Connection;
use thiserror::Error;

use soqlite_translate::rewrite::sanitize_identifier;

use crate::metadata::MetadataObject;

/// Tables owned by the store itself, never reported as provisioned objects.
const INTERNAL_TABLES: [&str; 3] = ["metadata_objects", "metadata_fields", "query_execution_log"];

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

#[derive(Debug, Clone)]
pub struct TableProvisioner {
    db_path: PathBuf,
}

impl TableProvisioner {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// Create the table for an object. Returns false (without touching the
    /// schema) when the table already exists.
    pub fn create_table_for_object(&self, object: &MetadataObject) -> Result<bool, ProvisionError> {
        let table = sanitize_identifier(&object.api_name);
        let conn = Connection::open(&self.db_path)?;

        if table_exists(&conn, &table)? {
            tracing::info!(table, "table already exists");
            return Ok(false);
        }

        let ddl = create_table_sql(object);
        conn.execute_batch(&ddl)?;
        tracing::info!(table, "created table");
        Ok(true)
    }

    pub fn table_exists(&self, name: &str) -> Result<bool, ProvisionError> {
        let conn = Connection::open(&self.db_path)?;
        Ok(table_exists(&conn, &sanitize_identifier(name))?)
    }

    pub fn drop_table(&self, object_api_name: &str) -> Result<(), ProvisionError> {
        let table = sanitize_identifier(object_api_name);
        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch(&format!("DROP TABLE IF EXISTS \"{table}\";"))?;
        tracing::info!(table, "dropped table");
        Ok(())
    }

    /// All provisioned object tables, internal bookkeeping excluded.
    pub fn created_tables(&self) -> Result<Vec<String>, ProvisionError> {
        let conn = Connection::open(&self.db_path)?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table'
               AND name NOT LIKE 'sqlite_%'
               AND name NOT IN (?1, ?2, ?3)
             ORDER BY name",
        )?;
        let names = stmt
            .query_map(INTERNAL_TABLES, |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool, rusqlite::Error> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn create_table_sql(object: &MetadataObject) -> String {
    let table = sanitize_identifier(&object.api_name);
    let mut sql = String::new();
    let _ = writeln!(sql, "CREATE TABLE \"{table}\" (");
    // Every object carries an Id primary key, whether or not the catalog
    // lists one.
    sql.push_str("    \"Id\" TEXT PRIMARY KEY NOT NULL");

    let mut fields: Vec<_> = object
        .fields
        .iter()
        .filter(|f| f.api_name != "Id")
        .collect();
    fields.sort_by(|a, b| a.api_name.cmp(&b.api_name));

    for field in fields {
        let column = sanitize_identifier(&field.api_name);
        let nullability = if field.is_required { "NOT NULL" } else { "NULL" };
        let _ = write!(
            sql,
            ",\n    \"{column}\" {} {nullability}",
            field.data_type.sqlite_type()
        );
    }
    sql.push_str("\n);");
    sql
}
