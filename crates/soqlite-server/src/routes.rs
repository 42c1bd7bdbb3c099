//! HTTP routes and handlers
//!
//! Thin layer over the store crate: handlers translate HTTP shapes to
//! service calls and map errors onto status codes. The query endpoint
//! returns the execution envelope as-is, with HTTP 400 for any outcome
//! where success is false.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use soqlite_store::history::DEFAULT_HISTORY_TOP;
use soqlite_store::{
    ExecutionRecord, MetadataCatalog, MetadataField, QueryOutcome, QueryService, SqliteCatalog,
    TableProvisioner,
};

/// Application state shared across handlers.
pub struct AppState {
    pub service: QueryService,
    pub catalog: SqliteCatalog,
    pub provisioner: TableProvisioner,
}

impl AppState {
    pub fn new(db_path: &str, query_timeout: std::time::Duration) -> Self {
        Self {
            service: QueryService::new(db_path).with_timeout(query_timeout),
            catalog: SqliteCatalog::new(db_path),
            provisioner: TableProvisioner::new(db_path),
        }
    }
}

/// Errors surfaced by handlers other than the query envelope itself.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Build the application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/query", post(execute_query))
        .route("/api/query/history", get(query_history))
        .route("/api/metadata/objects", get(list_objects))
        .route("/api/metadata/objects/:name/fields", get(object_fields))
        .route("/api/objects", get(provisioned_objects))
        .route("/api/objects/:name/provision", post(provision_object))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteQueryRequest {
    pub soql_query: String,
}

async fn execute_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExecuteQueryRequest>,
) -> (StatusCode, Json<QueryOutcome>) {
    let outcome = state.service.execute(&request.soql_query);
    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(outcome))
}

#[derive(Deserialize)]
pub struct HistoryParams {
    pub top: Option<usize>,
}

async fn query_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<ExecutionRecord>>, ApiError> {
    let records = state
        .service
        .history(params.top.unwrap_or(DEFAULT_HISTORY_TOP))
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(records))
}

async fn list_objects(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, ApiError> {
    let names = state
        .catalog
        .object_names()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(names))
}

async fn object_fields(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Vec<MetadataField>>, ApiError> {
    let object = state
        .catalog
        .object_by_name(&name)
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("Object '{name}' not found in metadata")))?;
    Ok(Json(object.fields))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionResponse {
    pub object_name: String,
    pub created: bool,
}

async fn provision_object(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ProvisionResponse>, ApiError> {
    let object = state
        .catalog
        .object_by_name(&name)
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("Object '{name}' not found in metadata")))?;

    let created = state
        .provisioner
        .create_table_for_object(&object)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(ProvisionResponse {
        object_name: object.api_name,
        created,
    }))
}

async fn provisioned_objects(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, ApiError> {
    let tables = state
        .provisioner
        .created_tables()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(tables))
}
