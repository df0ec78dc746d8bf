use axum::{routing::post, Router};
use cothink_core::config::RelayConfig;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::chat_handler;
use crate::state::AppState;

/// Router serving the chat endpoint at `route`
pub fn build_router(state: AppState, route: &str) -> Router {
    Router::new()
        .route(route, post(chat_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(
    state: AppState,
    config: &RelayConfig,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let app = build_router(state, &config.route);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Relay listening on {}{}", listener.local_addr()?, config.route);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            tracing::info!("Relay shutting down");
        })
        .await?;

    Ok(())
}
