//! HTTP client for the RagLab backends.
//!
//! Endpoints are derived from the configured base URL of each backend:
//! - `POST {base}/api/v1/rag/query`: run one RAG query
//! - `GET  {base}/api/v1/runs`     : recent query runs
//! - `GET  {base}/api/v1/health`   : liveness (see [`HealthService`])
//!
//! Calls are made exactly once: there is no retry. The client carries a bounded
//! timeout (`BACKEND_TIMEOUT_SECS`); an expired timeout surfaces as
//! [`UpstreamError::Unreachable`].
//!
//! # Examples
//!
//! ```no_run
//! use backend_service::{BackendConfig, BackendKey, RagBackendService};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = BackendConfig::default().with_base_url(BackendKey::Python, "http://localhost:8000");
//! let svc = RagBackendService::new(cfg)?;
//!
//! let reply = svc
//!     .query(BackendKey::Python, &json!({ "query": "what is rag?", "topK": 5 }))
//!     .await?;
//! println!("HTTP {} -> {}", reply.status, reply.body);
//! # Ok(()) }
//! ```

use std::time::{Duration, Instant};

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{Instrument, Span, debug, info, instrument, warn};

use crate::{
    config::{backend_config::BackendConfig, backend_key::BackendKey},
    error_handler::{Result, UpstreamError, make_snippet, transport_reason},
    health_service::{HealthService, HealthStatus},
    models::query_run::{DecodedRuns, QueryRun, RecentRuns, decode_runs},
    runs_aggregator::{merge_recent_runs, settle_all},
    telemetry,
};

/// Path of the query endpoint on every backend.
pub const QUERY_PATH: &str = "/api/v1/rag/query";
/// Path of the run-history endpoint on every backend.
pub const RUNS_PATH: &str = "/api/v1/runs";

/// A backend answer that was received and parsed as JSON.
///
/// The status may be anything; interpreting it is up to the caller.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    /// Backend that answered.
    pub backend: BackendKey,
    /// HTTP status returned by the backend.
    pub status: StatusCode,
    /// Parsed body; `Value::Null` when the body was empty.
    pub body: Value,
    /// Body bytes exactly as received, for verbatim relaying.
    pub raw: Vec<u8>,
    /// Wall-clock time of the call.
    pub latency_ms: u128,
}

/// Thin client over both backends.
///
/// Construct once, wrap in `Arc`, share between handlers. Holds no per-request state.
pub struct RagBackendService {
    client: reqwest::Client,
    cfg: BackendConfig,
    health: HealthService,
}

impl RagBackendService {
    /// Creates a new client from an explicit configuration.
    ///
    /// # Errors
    /// [`crate::BackendServiceError::HttpTransport`] if the HTTP client cannot be built.
    pub fn new(cfg: BackendConfig) -> Result<Self> {
        // Redirects are not followed: one request in, one backend call out.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        let health = HealthService::new(Some(cfg.health_timeout_secs))?;

        info!(
            configured = ?cfg.configured(),
            timeout_secs = cfg.timeout_secs,
            "RagBackendService initialized"
        );

        Ok(Self {
            client,
            cfg,
            health,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &BackendConfig {
        &self.cfg
    }

    /// Full URL of `path` on `backend`.
    ///
    /// # Errors
    /// [`crate::ConfigError::MissingBaseUrl`] if the backend has no base URL.
    pub fn endpoint(&self, backend: BackendKey, path: &str) -> Result<String> {
        let base = self.cfg.base_url(backend)?;
        Ok(format!("{base}{path}"))
    }

    /// Forwards one query payload to `backend`, unchanged.
    ///
    /// The payload is sent as-is; callers strip fields the backend does not expect.
    ///
    /// # Errors
    /// - [`crate::ConfigError::MissingBaseUrl`] before any network activity
    /// - [`UpstreamError::Unreachable`] on transport failure or timeout
    /// - [`UpstreamError::InvalidJson`] if the body is not JSON
    pub async fn query(&self, backend: BackendKey, payload: &Value) -> Result<UpstreamReply> {
        let url = self.endpoint(backend, QUERY_PATH)?;
        let span = telemetry::upstream_span(backend, QUERY_PATH);

        async {
            debug!("POST {}", url);
            let start = Instant::now();
            let resp = self
                .client
                .post(&url)
                .json(payload)
                .send()
                .await
                .map_err(|e| self.unreachable(backend, &e))?;

            self.read_reply(backend, resp, start).await
        }
        .instrument(span)
        .await
    }

    /// Reads `GET {base}/api/v1/runs` from `backend`, passing `params` through.
    ///
    /// # Errors
    /// Same as [`RagBackendService::query`].
    pub async fn runs(
        &self,
        backend: BackendKey,
        params: &[(&str, String)],
    ) -> Result<UpstreamReply> {
        let url = self.endpoint(backend, RUNS_PATH)?;
        let span = telemetry::upstream_span(backend, RUNS_PATH);

        async {
            debug!(?params, "GET {}", url);
            let start = Instant::now();
            let resp = self
                .client
                .get(&url)
                .query(params)
                .send()
                .await
                .map_err(|e| self.unreachable(backend, &e))?;

            self.read_reply(backend, resp, start).await
        }
        .instrument(span)
        .await
    }

    /// Typed run history of one backend, at most `limit` entries.
    ///
    /// Unlike [`RagBackendService::runs`], a non-success status is an error here.
    /// Records are read one by one; unreadable ones are logged and skipped so
    /// they do not take the rest of the history down with them.
    pub async fn recent_runs(
        &self,
        backend: BackendKey,
        limit: usize,
    ) -> std::result::Result<Vec<QueryRun>, UpstreamError> {
        let params = [("limit", limit.to_string())];
        let reply = self
            .runs(backend, &params)
            .await
            .map_err(|e| into_upstream(backend, e))?;

        if !reply.status.is_success() {
            return Err(UpstreamError::Status {
                backend,
                status: reply.status,
                snippet: make_snippet(&String::from_utf8_lossy(&reply.raw)),
            });
        }

        let DecodedRuns { mut runs, skipped } =
            decode_runs(reply.body).map_err(|reason| UpstreamError::Decode { backend, reason })?;
        for (index, reason) in &skipped {
            warn!(backend = %backend, index, %reason, "skipping unreadable run record");
        }
        runs.truncate(limit);
        Ok(runs)
    }

    /// Run history of every backend, merged newest first and capped at `limit`.
    ///
    /// Never fails: unreadable backends (including unconfigured ones) are listed
    /// in [`RecentRuns::failed_backends`].
    #[instrument(skip(self))]
    pub async fn recent_runs_all(&self, limit: usize) -> RecentRuns {
        let settled = settle_all(BackendKey::ALL, |backend| self.recent_runs(backend, limit)).await;

        for (backend, err) in &settled.rejected {
            warn!(backend = %backend, error = %err, "run history unavailable");
        }

        let merged = merge_recent_runs(settled, limit);
        debug!(
            runs = merged.runs.len(),
            failed = merged.failed_backends.len(),
            "run history merged"
        );
        merged
    }

    /// Health of every backend. Never fails.
    pub async fn health_all(&self) -> Vec<HealthStatus> {
        self.health.check_all(&self.cfg).await
    }

    /* --------------------- Internals --------------------- */

    fn unreachable(&self, backend: BackendKey, err: &reqwest::Error) -> UpstreamError {
        let reason = if err.is_timeout() {
            format!("request timed out after {}s", self.cfg.timeout_secs)
        } else {
            transport_reason(err)
        };
        warn!(backend = %backend, %reason, "backend unreachable");
        UpstreamError::Unreachable { backend, reason }
    }

    async fn read_reply(
        &self,
        backend: BackendKey,
        resp: reqwest::Response,
        start: Instant,
    ) -> Result<UpstreamReply> {
        let status = resp.status();
        let raw = resp
            .bytes()
            .await
            .map_err(|e| self.unreachable(backend, &e))?
            .to_vec();
        let latency_ms = start.elapsed().as_millis();
        telemetry::record_reply(&Span::current(), status, latency_ms);

        let body = if raw.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            serde_json::from_slice(&raw).map_err(|e| {
                warn!(
                    backend = %backend,
                    %status,
                    snippet = %make_snippet(&String::from_utf8_lossy(&raw)),
                    "backend returned invalid JSON"
                );
                UpstreamError::InvalidJson {
                    backend,
                    status,
                    reason: e.to_string(),
                }
            })?
        };

        info!(backend = %backend, %status, latency_ms, "backend replied");

        Ok(UpstreamReply {
            backend,
            status,
            body,
            raw,
            latency_ms,
        })
    }
}

/// Collapses a crate error into the upstream failure of one source.
fn into_upstream(backend: BackendKey, err: crate::BackendServiceError) -> UpstreamError {
    match err {
        crate::BackendServiceError::Upstream(e) => e,
        other => UpstreamError::Unreachable {
            backend,
            reason: other.to_string(),
        },
    }
}
