//! HTTP server implementation using Axum.

use crate::handler::{
    handle_cache_stats, handle_health, handle_menu, handle_message, handle_page, handle_tabs,
};
use crate::tabs::TabRecorder;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use toolcache_core::extension::MessengerHandle;
use toolcache_core::{Background, Registration};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use url::Url;

/// Upper bound on requests handled at once, mostly upstream page fetches.
const MAX_CONCURRENT_REQUESTS: usize = 64;

/// Application state shared across handlers.
pub struct AppState {
    /// Worker registration serving page requests
    pub registration: Registration,
    /// Background context (install hook, context menu)
    pub background: Background,
    /// Running message loop for the background context
    pub messenger: MessengerHandle,
    /// Tabs opened on behalf of the extension
    pub tabs: Arc<TabRecorder>,
    /// Origin page requests are resolved against
    pub origin: Url,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    // Extension contexts call in from their own origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/message", post(handle_message))
        .route("/menu", post(handle_menu))
        .route("/cache/stats", get(handle_cache_stats))
        .route("/tabs", get(handle_tabs))
        .fallback(handle_page)
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(
    state: Arc<AppState>,
    host: &str,
    port: u16,
) -> anyhow::Result<SocketAddr> {
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}
