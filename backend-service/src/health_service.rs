//! Health probes for the RagLab backends.
//!
//! Each backend exposes `GET {base}/api/v1/health` returning
//! `{ "status": "ok", "service": "raglab-api", "backend": "...", ... }`.
//!
//! The returned [`HealthStatus`] is JSON-serializable and suitable for a `/health` endpoint.
//! [`HealthService::check`] is resilient and never fails (errors mapped to `ok=false`).
//! [`HealthService::try_probe`] returns a strict `Result`.

use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::Serialize;
use tracing::{Instrument, Span, debug, info, warn};

use crate::{
    config::{
        backend_config::{BackendConfig, DEFAULT_HEALTH_TIMEOUT_SECS},
        backend_key::BackendKey,
    },
    error_handler::{BackendServiceError, UpstreamError, make_snippet, transport_reason},
    telemetry,
};

/// Path of the health endpoint on every backend.
pub const HEALTH_PATH: &str = "/api/v1/health";

/// A serializable health snapshot for a single backend.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    /// Probed backend.
    pub backend: BackendKey,
    /// Base URL, if configured.
    pub endpoint: Option<String>,
    /// Overall health flag.
    pub ok: bool,
    /// Measured HTTP latency in milliseconds.
    pub latency_ms: u128,
    /// Short human-readable message with details.
    pub message: String,
}

impl HealthStatus {
    #[inline]
    fn ok(backend: BackendKey, endpoint: &str, latency_ms: u128, message: impl Into<String>) -> Self {
        Self {
            backend,
            endpoint: Some(endpoint.to_string()),
            ok: true,
            latency_ms,
            message: message.into(),
        }
    }

    #[inline]
    fn fail(
        backend: BackendKey,
        endpoint: Option<&str>,
        latency_ms: u128,
        message: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            endpoint: endpoint.map(str::to_string),
            ok: false,
            latency_ms,
            message: message.into(),
        }
    }
}

/// A health checker that reuses a single HTTP client.
pub struct HealthService {
    client: reqwest::Client,
    timeout: Duration,
}

impl HealthService {
    /// Creates a new health service with an optional client timeout
    /// (seconds, default [`DEFAULT_HEALTH_TIMEOUT_SECS`]).
    ///
    /// # Errors
    /// Returns [`BackendServiceError::HttpTransport`] if the HTTP client cannot be built.
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, BackendServiceError> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_HEALTH_TIMEOUT_SECS));
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        debug!(timeout_secs = timeout.as_secs(), "HealthService initialized");

        Ok(Self { client, timeout })
    }

    /// Checks one backend. Never fails: problems become `ok = false`.
    pub async fn check(&self, cfg: &BackendConfig, backend: BackendKey) -> HealthStatus {
        let base = match cfg.base_url(backend) {
            Ok(base) => base,
            Err(err) => {
                warn!(backend = %backend, error = %err, "health probe skipped");
                return HealthStatus::fail(
                    backend,
                    None,
                    0,
                    format!("{} is not configured", backend.base_url_var()),
                );
            }
        };

        let start = Instant::now();
        let span = telemetry::upstream_span(backend, HEALTH_PATH);
        match self.try_probe(backend, base).instrument(span).await {
            Ok(status) => {
                info!(
                    backend = %backend,
                    ok = status.ok,
                    latency_ms = status.latency_ms,
                    "health probe completed"
                );
                status
            }
            Err(err) => {
                let latency_ms = start.elapsed().as_millis();
                warn!(
                    backend = %backend,
                    latency_ms,
                    error = %err,
                    "health probe failed"
                );
                HealthStatus::fail(backend, Some(base), latency_ms, err.reason())
            }
        }
    }

    /// Checks every backend concurrently.
    pub async fn check_all(&self, cfg: &BackendConfig) -> Vec<HealthStatus> {
        join_all(BackendKey::ALL.map(|backend| self.check(cfg, backend))).await
    }

    /// Strict probe. Returns an error on hard failures.
    ///
    /// - `GET {base}/api/v1/health`
    /// - Ensure 2xx
    /// - Best-effort: `status` field must be `"ok"` when present
    pub async fn try_probe(
        &self,
        backend: BackendKey,
        base: &str,
    ) -> Result<HealthStatus, UpstreamError> {
        let url = format!("{base}{HEALTH_PATH}");
        debug!(backend = %backend, "GET {}", url);

        let start = Instant::now();
        let resp = self.client.get(&url).send().await.map_err(|e| {
            let reason = if e.is_timeout() {
                format!("health probe timed out after {}s", self.timeout.as_secs())
            } else {
                transport_reason(&e)
            };
            UpstreamError::Unreachable { backend, reason }
        })?;
        let latency = start.elapsed().as_millis();
        telemetry::record_reply(&Span::current(), resp.status(), latency);

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                backend,
                status,
                snippet: make_snippet(&text),
            });
        }

        // Expected minimal JSON: { "status": "ok", ... }
        #[derive(serde::Deserialize)]
        struct Health {
            status: Option<String>,
        }

        match resp.json::<Health>().await {
            Ok(Health { status: Some(s) }) if s != "ok" => Ok(HealthStatus::fail(
                backend,
                Some(base),
                latency,
                format!("backend reports status `{s}`"),
            )),
            Ok(_) => Ok(HealthStatus::ok(backend, base, latency, "backend is healthy")),
            Err(e) => {
                warn!(
                    backend = %backend,
                    error = %e,
                    "failed to decode health body; treating backend as reachable"
                );
                Ok(HealthStatus::ok(
                    backend,
                    base,
                    latency,
                    format!("backend is reachable; failed to decode health body: {e}"),
                ))
            }
        }
    }
}
