//! SQLite-backed store for soqlite
//!
//! Everything that touches the database lives here: query execution with
//! timeout enforcement, the best-effort execution history log, the object
//! metadata catalog, and dynamic table provisioning. The translation core
//! (`soqlite-translate`) stays pure; this crate feeds it and runs its
//! output.

pub mod executor;
pub mod history;
pub mod metadata;
pub mod provision;
pub mod service;

pub use executor::{ColumnDescriptor, ExecutionError, QueryExecutor, ResultSet};
pub use history::{ExecutionRecord, HistoryError, HistoryRecorder};
pub use metadata::{
    CatalogError, FieldDataType, MetadataCatalog, MetadataField, MetadataObject, SqliteCatalog,
};
pub use provision::{ProvisionError, TableProvisioner};
pub use service::{QueryOutcome, QueryService};
