use backend_service::health_service::HealthStatus;
use serde::Serialize;

/// Response payload for GET /api/health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "ok" when the proxy answers.
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    /// RFC3339 UTC timestamp.
    pub time: String,
    /// One probe per backend.
    pub backends: Vec<HealthStatus>,
}
