//! Quire Server - reconciliation server for collaboratively edited documents.
//!
//! This server provides HTTP and WebSocket endpoints for sites editing a shared
//! text document. Submitted operations are folded into each document with the
//! quire-engine reconciliation logic.

mod config;
mod error;
mod handlers;
mod routes;
mod store;
mod websocket;

use crate::config::Config;
use crate::store::{DocumentStore, MemoryStore};
use crate::websocket::ConnectionManager;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<Config>,
    pub conn_manager: Arc<ConnectionManager>,
}

impl AppState {
    /// Build state around an empty in-memory store.
    pub fn new(config: Config) -> Self {
        Self {
            store: MemoryStore::new_shared(),
            config: Arc::new(config),
            conn_manager: ConnectionManager::new_shared(),
        }
    }
}

/// Build the application router.
pub fn build_app(state: AppState) -> Router {
    let origins = if state.config.cors_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(state.config.cors_origins.clone())
    };

    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quire_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(
        max_batch_size = config.max_batch_size,
        cors_origins = config.cors_origins.len(),
        "Starting Quire Server on {}:{}",
        config.host,
        config.port
    );

    let addr = format!("{}:{}", config.host, config.port);
    let app = build_app(AppState::new(config));

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
