//! Read-only HTTP API over the concepts database.

use axum::{routing::get, Router};
use rusqlite::Connection;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::store::{self, ConceptPool};
use crate::utils::error::{ConceptsError, Result};

pub mod error;
pub mod handlers;

/// Shared across handlers; cloning only bumps the pool's reference count.
#[derive(Clone)]
pub struct AppState {
    pool: ConceptPool,
}

impl AppState {
    pub fn new(pool: ConceptPool) -> Self {
        Self { pool }
    }

    /// Runs `f` with a pooled connection on the blocking thread pool.
    pub async fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn)
        })
        .await
        .map_err(|e| ConceptsError::processing(format!("query task failed: {}", e)))?
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/concepts/:concept_id", get(handlers::get_concept))
        .route("/search", get(handlers::search_concepts))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Opens the database pool, binds and serves until Ctrl-C.
pub async fn serve(config: &ServerConfig) -> Result<()> {
    let pool = store::read_only_pool(&config.database_path, config.pool_size)?;
    {
        let conn = pool.get()?;
        let concepts = store::count_concepts(&conn)?;
        tracing::info!(
            "Serving {} concepts from {}",
            concepts,
            config.database_path
        );
    }

    let app = router(AppState::new(pool));
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
