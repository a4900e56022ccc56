//! Axum server wiring for the Seedcast HTTP surface.

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::response::Redirect;
use axum::routing::{get, post};
use chrono::{DateTime, Utc};
use seedcast_core::config::SeedcastConfig;
use seedcast_core::{AppStateStore, IngestCoordinator, WebTorrentSeeder};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

use crate::handlers::{access_magnet_uri, clear, info as info_handler, stats, upload};

/// Shared request context, constructed once at startup.
///
/// Every handler receives the state store, the ingest coordinator, and the
/// configuration through this struct; there are no process-wide globals.
#[derive(Clone)]
pub struct AppState {
    pub config: SeedcastConfig,
    pub state: Arc<AppStateStore>,
    pub ingest: Arc<IngestCoordinator>,
    pub started_at: DateTime<Utc>,
    pub version: &'static str,
}

impl AppState {
    /// Builds the request context around an already-opened store and
    /// coordinator.
    pub fn new(
        config: SeedcastConfig,
        state: Arc<AppStateStore>,
        ingest: Arc<IngestCoordinator>,
    ) -> Self {
        Self {
            config,
            state,
            ingest,
            started_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let www_dir = state.config.storage.www_dir.clone();
    Router::new()
        .route("/", get(index_redirect))
        .route("/favicon.ico", get(favicon_redirect))
        // Upload size is bounded by disk, not by the HTTP layer.
        .route("/upload", post(upload).layer(DefaultBodyLimit::disable()))
        .route("/accessMagnetURI", get(access_magnet_uri))
        .route("/info", get(info_handler))
        .route("/stats", get(stats))
        .route("/clear", get(clear))
        // Static assets (minimal)
        .nest_service("/www", ServeDir::new(www_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index_redirect() -> Redirect {
    Redirect::to("/www/index.html")
}

async fn favicon_redirect() -> Redirect {
    Redirect::to("/www/favicon.ico")
}

/// Opens the state store, builds the ingest pipeline, and serves the HTTP
/// surface until shutdown.
///
/// # Errors
/// - `Box<dyn std::error::Error>` - The data directory or state database
///   could not be opened (fatal: the service cannot run without them), or
///   the listener could not bind.
pub async fn run_server(config: SeedcastConfig) -> Result<(), Box<dyn std::error::Error>> {
    tokio::fs::create_dir_all(&config.storage.data_dir).await?;

    let state_store = Arc::new(AppStateStore::open(
        &config.storage.state_db_path(),
        &config.storage.state_table,
    )?);
    let seeder = Arc::new(WebTorrentSeeder::new(config.seeding.clone()));
    let ingest = Arc::new(IngestCoordinator::new(
        config.storage.data_dir.clone(),
        seeder,
        state_store.clone(),
    ));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = router(AppState::new(config, state_store, ingest));

    info!("Seedcast server running on http://{addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Application shutdown");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to install shutdown signal handler: {e}");
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_router_builds_with_default_config() {
        let dir = TempDir::new().unwrap();
        let mut config = SeedcastConfig::default();
        config.storage.data_dir = dir.path().to_path_buf();

        let store = Arc::new(
            AppStateStore::open(&config.storage.state_db_path(), &config.storage.state_table)
                .unwrap(),
        );
        let seeder = Arc::new(WebTorrentSeeder::new(config.seeding.clone()));
        let ingest = Arc::new(IngestCoordinator::new(
            config.storage.data_dir.clone(),
            seeder,
            store.clone(),
        ));

        let _router = router(AppState::new(config, store, ingest));
    }
}
