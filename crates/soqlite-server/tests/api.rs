//! Router-level tests driven through tower's oneshot, no socket needed.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use rusqlite::Connection;
use tower::ServiceExt;

use soqlite_server::{build_router, AppState};
use soqlite_store::{FieldDataType, MetadataField, MetadataObject, SqliteCatalog};

fn seeded_state(dir: &tempfile::TempDir) -> Arc<AppState> {
    let db_path = dir.path().join("store.db");
    let conn = Connection::open(&db_path).unwrap();
    conn.execute_batch(
        "CREATE TABLE Account (Id TEXT PRIMARY KEY NOT NULL, Name TEXT, Industry TEXT);
         INSERT INTO Account VALUES ('001', 'Acme', 'Tech'), ('002', 'Globex', 'Energy');",
    )
    .unwrap();
    drop(conn);

    let path = db_path.to_str().unwrap().to_string();
    Arc::new(AppState::new(&path, Duration::from_secs(30)))
}

async fn send_json(
    state: Arc<AppState>,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(match body {
            Some(value) => Body::from(value.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = build_router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn health_reports_version() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = send_json(seeded_state(&dir), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn query_endpoint_returns_rows_and_telemetry() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = send_json(
        seeded_state(&dir),
        "POST",
        "/api/query",
        Some(serde_json::json!({
            "soqlQuery": "SELECT Id, Name FROM Account WHERE Industry = 'Tech' ORDER BY Name LIMIT 10"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["recordCount"], 1);
    assert_eq!(body["data"][0]["Name"], "Acme");
    assert_eq!(body["columns"][0]["name"], "Id");
    assert_eq!(body["columns"][0]["dataType"], "TEXT");
    assert_eq!(
        body["sqlQuery"],
        "SELECT Id, Name FROM \"Account\" WHERE Industry = 'Tech' ORDER BY Name LIMIT 10"
    );
    assert!(body["executionTimeMs"].is_u64());
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn invalid_query_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let (status, body) = send_json(
        seeded_state(&dir),
        "POST",
        "/api/query",
        Some(serde_json::json!({ "soqlQuery": "SELECT Id" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Query must contain FROM clause");
    assert_eq!(body["recordCount"], 0);
}

#[tokio::test]
async fn failed_execution_appears_in_history() {
    let dir = tempfile::tempdir().unwrap();
    let state = seeded_state(&dir);

    let (status, body) = send_json(
        state.clone(),
        "POST",
        "/api/query",
        Some(serde_json::json!({ "soqlQuery": "SELECT Id FROM Nonexistent" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = send_json(state, "GET", "/api/query/history?top=5", None).await;
    assert_eq!(status, StatusCode::OK);
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["success"], false);
    assert_eq!(records[0]["soqlQuery"], "SELECT Id FROM Nonexistent");
}

#[tokio::test]
async fn metadata_and_provisioning_flow() {
    let dir = tempfile::tempdir().unwrap();
    let state = seeded_state(&dir);

    // Unknown object: both reads 404.
    let (status, _) = send_json(state.clone(), "GET", "/api/metadata/objects/Lead/fields", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send_json(state.clone(), "POST", "/api/objects/Lead/provision", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Sync one object into the catalog, then provision it twice.
    let catalog = SqliteCatalog::new(dir.path().join("store.db"));
    catalog
        .sync_objects(&[MetadataObject {
            api_name: "Lead".to_string(),
            label: "Lead".to_string(),
            fields: vec![MetadataField {
                api_name: "Company".to_string(),
                label: "Company".to_string(),
                data_type: FieldDataType::String,
                length: Some(255),
                is_required: false,
            }],
        }])
        .unwrap();

    let (status, body) = send_json(state.clone(), "GET", "/api/metadata/objects/Lead/fields", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["apiName"], "Company");

    let (status, body) = send_json(state.clone(), "POST", "/api/objects/Lead/provision", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], true);

    let (_, body) = send_json(state.clone(), "POST", "/api/objects/Lead/provision", None).await;
    assert_eq!(body["created"], false);

    let (status, body) = send_json(state, "GET", "/api/objects", None).await;
    assert_eq!(status, StatusCode::OK);
    let tables: Vec<String> =
        serde_json::from_value(body).unwrap();
    assert!(tables.contains(&"Lead".to_string()));
    assert!(!tables.contains(&"metadata_objects".to_string()));
}
