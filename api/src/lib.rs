//! HTTP surface of the RagLab proxy.
//!
//! Routes:
//! - `POST /api/rag`: query, backend chosen by the body
//! - `POST /api/{backend}/api/v1/rag/query`: query, backend chosen by the path
//! - `GET  /api/{backend}/api/v1/runs`: one backend's run history
//! - `GET  /api/runs`: merged run history of all backends
//! - `GET  /api/health`: proxy and backend health

pub mod core;
pub mod error_handler;
pub mod middleware_layer;
pub mod routes;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tokio::signal;
use tracing::{error, info};

use crate::{
    core::app_state::AppState,
    error_handler::AppError,
    middleware_layer::error_envelope_mapper::error_envelope_mapper,
    routes::{
        health::health_route::health_route,
        rag_proxy::rag_proxy_route::{backend_query_route, rag_proxy_route},
        runs::runs_route::{backend_runs_route, recent_runs_route},
    },
};

/// Loads configuration from the environment and serves until Ctrl+C.
pub async fn start() -> Result<(), AppError> {
    let state = Arc::new(AppState::from_env()?);
    let address = state.config.api_address.clone();

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(AppError::Bind)?;
    info!(%address, "raglab proxy listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("raglab proxy stopped");
    Ok(())
}

/// Router with every route and the envelope middleware installed.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/rag", post(rag_proxy_route))
        .route("/api/{backend}/api/v1/rag/query", post(backend_query_route))
        .route("/api/{backend}/api/v1/runs", get(backend_runs_route))
        .route("/api/runs", get(recent_runs_route))
        .route("/api/health", get(health_route))
        .fallback(|| async { AppError::NotFound })
        .layer(middleware::from_fn(error_envelope_mapper))
        .with_state(state)
}

/// Resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => error!(error = %e, "failed to listen for shutdown signal"),
    }
}
