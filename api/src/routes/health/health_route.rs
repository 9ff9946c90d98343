use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::Utc;
use tracing::{debug, instrument};

use crate::{core::app_state::AppState, routes::health::health_response::HealthResponse};

/// Handler: GET /api/health
///
/// Always 200. Backend probes that fail are reported with `ok: false`.
#[instrument(name = "health_route", skip_all)]
pub async fn health_route(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let backends = state.backends.health_all().await;
    debug!(
        healthy = backends.iter().filter(|b| b.ok).count(),
        total = backends.len(),
        "backend probes finished"
    );

    Json(HealthResponse {
        status: "ok",
        service: "raglab-proxy",
        version: env!("CARGO_PKG_VERSION"),
        time: Utc::now().to_rfc3339(),
        backends,
    })
}
