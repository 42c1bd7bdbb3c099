use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use soqlite_server::{build_router, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path =
        std::env::var("SOQLITE_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = Config::load_or_default(&config_path)?;

    config.apply_logging_env();
    soqlite_server::logging::init();

    let state = Arc::new(AppState::new(
        &config.database.path,
        Duration::from_secs(config.database.query_timeout_secs),
    ));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, database = %config.database.path, "soqlite server listening");

    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
