use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use backend_service::{
    BackendServiceError, ConfigError as BackendConfigError, UpstreamError,
    models::{ErrorEnvelope, error_envelope::codes},
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::core::app_state::ConfigError;

/// Public application error type.
///
/// Every variant renders as an [`ErrorEnvelope`]; handlers never return raw text.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error(transparent)]
    Config(#[from] ConfigError),

    // --- IO / network / server ---
    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request / routing ---
    /// Client input fault; nothing was sent upstream.
    #[error("{message}")]
    BadRequest {
        message: String,
        details: Option<Value>,
    },

    /// Local misconfiguration discovered while serving a request.
    #[error("{message}")]
    Internal {
        message: String,
        details: Option<Value>,
    },

    /// Backend unreachable, malformed, or failed without its own envelope.
    #[error("{message}")]
    Upstream {
        status: StatusCode,
        message: String,
        details: Option<Value>,
    },

    #[error("not found")]
    NotFound,
}

impl AppError {
    /// `BAD_REQUEST` pointing at one request field.
    pub fn bad_field(message: impl Into<String>, field: &str) -> Self {
        AppError::BadRequest {
            message: message.into(),
            details: Some(json!({ "field": field })),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Upstream { status, .. } => *status,
            AppError::Config(_)
            | AppError::Internal { .. }
            | AppError::Bind(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::BadRequest { .. } => codes::BAD_REQUEST,
            AppError::NotFound => codes::NOT_FOUND,
            AppError::Upstream { .. } => codes::UPSTREAM_ERROR,
            AppError::Config(_)
            | AppError::Internal { .. }
            | AppError::Bind(_)
            | AppError::Server(_) => codes::INTERNAL_ERROR,
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            AppError::BadRequest { details, .. }
            | AppError::Internal { details, .. }
            | AppError::Upstream { details, .. } => details.clone(),
            _ => None,
        }
    }

    /// Envelope rendered for this error.
    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope::new(self.error_code(), self.to_string(), self.details())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.envelope())).into_response()
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

/// Convert query-string rejections to `AppError`.
impl From<axum::extract::rejection::QueryRejection> for AppError {
    fn from(err: axum::extract::rejection::QueryRejection) -> Self {
        AppError::BadRequest {
            message: "Invalid query string.".into(),
            details: Some(json!({ "reason": err.body_text() })),
        }
    }
}

/// Map backend-client failures onto the proxy's error taxonomy.
///
/// Configuration faults are `INTERNAL_ERROR` (500); every upstream fault is
/// `UPSTREAM_ERROR` (502) with the backend named in `details`.
impl From<BackendServiceError> for AppError {
    fn from(err: BackendServiceError) -> Self {
        match err {
            BackendServiceError::Config(BackendConfigError::MissingBaseUrl { backend, var }) => {
                AppError::Internal {
                    message: format!("Missing base URL for {backend} backend."),
                    details: Some(json!({ "env": var })),
                }
            }
            BackendServiceError::Config(other) => AppError::Internal {
                message: "Backend configuration is invalid.".into(),
                details: Some(json!({ "reason": other.to_string() })),
            },
            BackendServiceError::Upstream(up) => up.into(),
            other => AppError::Internal {
                message: "Unexpected server error.".into(),
                details: Some(json!({ "reason": other.to_string() })),
            },
        }
    }
}

impl From<UpstreamError> for AppError {
    fn from(err: UpstreamError) -> Self {
        let backend = err.backend();
        let (message, details) = match &err {
            UpstreamError::Unreachable { reason, .. } => (
                "Unable to reach the backend service.",
                json!({ "reason": reason, "backend": backend }),
            ),
            UpstreamError::InvalidJson { status, reason, .. } => (
                if status.is_success() {
                    "Backend returned invalid JSON."
                } else {
                    "Backend returned an error response."
                },
                json!({ "reason": reason, "backend": backend, "status": status.as_u16() }),
            ),
            UpstreamError::Status { status, .. } => (
                "Backend returned an error response.",
                json!({ "backend": backend, "status": status.as_u16() }),
            ),
            _ => (
                "Backend returned an unexpected response.",
                json!({ "reason": err.reason(), "backend": backend }),
            ),
        };

        AppError::Upstream {
            status: StatusCode::BAD_GATEWAY,
            message: message.into(),
            details: Some(details),
        }
    }
}
