//! soqlite HTTP server
//!
//! Exposes the SOQL query-execution pipeline over HTTP: a query endpoint
//! returning typed rows plus telemetry, a history read path, and the
//! metadata/provisioning collaborators used to set objects up.

pub mod config;
pub mod logging;
pub mod routes;

pub use config::{Config, ConfigError};
pub use routes::{build_router, AppState};
