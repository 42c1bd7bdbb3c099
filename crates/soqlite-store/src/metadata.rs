//! Object metadata catalog
//!
//! Read-only lookup consumed by query-building clients and by table
//! provisioning: given an object API name, return its field list with data
//! types. The translator itself never consults the catalog; field text in
//! queries stays opaque to it.

use std::path::PathBuf;

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Unknown field data type: {0}")]
    UnknownDataType(String),
}

/// Field data types understood by the catalog, mirroring the source
/// system's field model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldDataType {
    Id,
    String,
    Textarea,
    Email,
    Phone,
    Url,
    Picklist,
    Reference,
    Int,
    Double,
    Currency,
    Percent,
    Boolean,
    Date,
    DateTime,
    Time,
}

impl FieldDataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldDataType::Id => "Id",
            FieldDataType::String => "String",
            FieldDataType::Textarea => "Textarea",
            FieldDataType::Email => "Email",
            FieldDataType::Phone => "Phone",
            FieldDataType::Url => "Url",
            FieldDataType::Picklist => "Picklist",
            FieldDataType::Reference => "Reference",
            FieldDataType::Int => "Int",
            FieldDataType::Double => "Double",
            FieldDataType::Currency => "Currency",
            FieldDataType::Percent => "Percent",
            FieldDataType::Boolean => "Boolean",
            FieldDataType::Date => "Date",
            FieldDataType::DateTime => "DateTime",
            FieldDataType::Time => "Time",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CatalogError> {
        match s {
            "Id" => Ok(FieldDataType::Id),
            "String" => Ok(FieldDataType::String),
            "Textarea" => Ok(FieldDataType::Textarea),
            "Email" => Ok(FieldDataType::Email),
            "Phone" => Ok(FieldDataType::Phone),
            "Url" => Ok(FieldDataType::Url),
            "Picklist" => Ok(FieldDataType::Picklist),
            "Reference" => Ok(FieldDataType::Reference),
            "Int" => Ok(FieldDataType::Int),
            "Double" => Ok(FieldDataType::Double),
            "Currency" => Ok(FieldDataType::Currency),
            "Percent" => Ok(FieldDataType::Percent),
            "Boolean" => Ok(FieldDataType::Boolean),
            "Date" => Ok(FieldDataType::Date),
            "DateTime" => Ok(FieldDataType::DateTime),
            "Time" => Ok(FieldDataType::Time),
            other => Err(CatalogError::UnknownDataType(other.to_string())),
        }
    }

    /// SQLite column type for provisioned tables.
    pub fn sqlite_type(&self) -> &'static str {
        match self {
            FieldDataType::Int | FieldDataType::Boolean => "INTEGER",
            FieldDataType::Double | FieldDataType::Currency | FieldDataType::Percent => "REAL",
            _ => "TEXT",
        }
    }
}

/// One field on a catalog object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataField {
    pub api_name: String,
    pub label: String,
    pub data_type: FieldDataType,
    pub length: Option<u32>,
    pub is_required: bool,
}

/// A tabular data object: API name, display label, fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataObject {
    pub api_name: String,
    pub label: String,
    pub fields: Vec<MetadataField>,
}

/// Read-side catalog interface.
pub trait MetadataCatalog {
    fn object_names(&self) -> Result<Vec<String>, CatalogError>;
    fn object_by_name(&self, api_name: &str) -> Result<Option<MetadataObject>, CatalogError>;
    fn fields_for_object(&self, object_api_name: &str) -> Result<Vec<MetadataField>, CatalogError>;
}

/// SQLite-backed catalog with a bulk `sync_objects` write path.
#[derive(Debug, Clone)]
pub struct SqliteCatalog {
    db_path: PathBuf,
}

impl SqliteCatalog {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// Replace the stored definition of each given object.
    pub fn sync_objects(&self, objects: &[MetadataObject]) -> Result<(), CatalogError> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        for object in objects {
            tx.execute(
                "INSERT OR REPLACE INTO metadata_objects (api_name, label) VALUES (?1, ?2)",
                params![object.api_name, object.label],
            )?;
            tx.execute(
                "DELETE FROM metadata_fields WHERE object_api_name = ?1",
                params![object.api_name],
            )?;
            for field in &object.fields {
                tx.execute(
                    "INSERT INTO metadata_fields
                         (object_api_name, api_name, label, data_type, length, is_required)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        object.api_name,
                        field.api_name,
                        field.label,
                        field.data_type.as_str(),
                        field.length,
                        field.is_required,
                    ],
                )?;
            }
        }
        tx.commit()?;
        tracing::info!(objects = objects.len(), "synced metadata catalog");
        Ok(())
    }

    fn open(&self) -> Result<Connection, rusqlite::Error> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS metadata_objects (
                 api_name TEXT PRIMARY KEY,
                 label TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS metadata_fields (
                 object_api_name TEXT NOT NULL,
                 api_name TEXT NOT NULL,
                 label TEXT NOT NULL,
                 data_type TEXT NOT NULL,
                 length INTEGER,
                 is_required INTEGER NOT NULL,
                 PRIMARY KEY (object_api_name, api_name)
             );",
        )?;
        Ok(conn)
    }
}

impl MetadataCatalog for SqliteCatalog {
    fn object_names(&self) -> Result<Vec<String>, CatalogError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare("SELECT api_name FROM metadata_objects ORDER BY api_name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    fn object_by_name(&self, api_name: &str) -> Result<Option<MetadataObject>, CatalogError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare("SELECT label FROM metadata_objects WHERE api_name = ?1")?;
        let mut rows = stmt.query_map([api_name], |row| row.get::<_, String>(0))?;

        let Some(label) = rows.next().transpose()? else {
            return Ok(None);
        };
        Ok(Some(MetadataObject {
            api_name: api_name.to_string(),
            label,
            fields: self.fields_for_object(api_name)?,
        }))
    }

    fn fields_for_object(&self, object_api_name: &str) -> Result<Vec<MetadataField>, CatalogError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT api_name, label, data_type, length, is_required
             FROM metadata_fields
             WHERE object_api_name = ?1
             ORDER BY api_name",
        )?;

        let rows = stmt.query_map([object_api_name], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<u32>>(3)?,
                row.get::<_, bool>(4)?,
            ))
        })?;

        let mut fields = Vec::new();
        for row in rows {
            let (api_name, label, data_type, length, is_required) = row?;
            fields.push(MetadataField {
                api_name,
                label,
                data_type: FieldDataType::parse(&data_type)?,
                length,
                is_required,
            });
        }
        Ok(fields)
    }
}
