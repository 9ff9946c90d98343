use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use backend_service::{models::RecentRuns, runs_aggregator::clamp_runs_limit};
use tracing::{info, instrument, warn};

use crate::{
    core::{
        app_state::AppState,
        http::response_envelope::JsonReply,
        proxy_translator::{route_backend, translate_reply},
    },
    error_handler::AppResult,
    routes::runs::runs_request::RunsParams,
};

/// Handler: GET /api/{backend}/api/v1/runs?limit=N
///
/// Passes the backend's run history through, normalized like a query call.
#[instrument(name = "backend_runs_route", skip(state, params))]
pub async fn backend_runs_route(
    State(state): State<Arc<AppState>>,
    Path(backend): Path<String>,
    params: Result<Query<RunsParams>, QueryRejection>,
) -> AppResult<JsonReply> {
    let backend = route_backend(&backend)?;
    let Query(params) = params?;

    let mut forwarded = Vec::with_capacity(2);
    if params.limit.is_some() {
        forwarded.push(("limit", clamp_runs_limit(params.limit).to_string()));
    }
    if let Some(filter) = params.backend.filter(|b| !b.trim().is_empty()) {
        forwarded.push(("backend", filter));
    }

    let reply = state
        .backends
        .runs(backend, &forwarded)
        .await
        .inspect_err(|err| warn!(backend = %backend, error = %err, "run history call failed"))?;

    info!(backend = %backend, status = %reply.status, latency_ms = reply.latency_ms, "runs proxied");
    translate_reply(reply)
}

/// Handler: GET /api/runs?limit=N
///
/// Merged history of every backend. Always 200; unreadable backends are
/// listed under `failedBackends`.
#[instrument(name = "recent_runs_route", skip(state, params))]
pub async fn recent_runs_route(
    State(state): State<Arc<AppState>>,
    params: Result<Query<RunsParams>, QueryRejection>,
) -> AppResult<Json<RecentRuns>> {
    let Query(params) = params?;
    let limit = clamp_runs_limit(params.limit);

    let merged = state.backends.recent_runs_all(limit).await;
    if merged.is_unavailable() {
        warn!(failed = merged.failed_backends.len(), "no backend returned run history");
    }
    Ok(Json(merged))
}
