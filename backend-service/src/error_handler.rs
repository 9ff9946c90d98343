//! Unified error handling for `backend-service`.
//!
//! This module exposes a single top-level error type [`BackendServiceError`] for
//! the whole library, and groups domain-specific errors in nested enums
//! ([`ConfigError`], [`UpstreamError`]). Small helpers for reading/validating
//! environment variables are provided and return the unified [`Result<T>`] alias.
//!
//! All messages include the suffix `[Backend Service]` to simplify attribution in logs.

use reqwest::StatusCode;
use thiserror::Error;

use crate::config::backend_key::BackendKey;

/* ------------------------------------------------------------------------- */
/* Public result alias                                                       */
/* ------------------------------------------------------------------------- */

/// Unified result alias for the entire crate.
pub type Result<T> = std::result::Result<T, BackendServiceError>;

/* ------------------------------------------------------------------------- */
/* Top-level error                                                           */
/* ------------------------------------------------------------------------- */

/// Top-level error for the `backend-service` crate.
///
/// Configuration faults are local and never reach the network; upstream
/// faults always carry the backend they happened on.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BackendServiceError {
    /// Configuration/validation errors (startup or per-request lookup).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Anything that went wrong with or after the call to a backend.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The HTTP client itself could not be built.
    #[error("[Backend Service] transport error: {0}")]
    HttpTransport(#[from] reqwest::Error),
}

/* ------------------------------------------------------------------------- */
/* Config errors                                                             */
/* ------------------------------------------------------------------------- */

/// Error enum for environment/config-driven setup.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing or empty.
    #[error("[Backend Service] missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// The selected backend has no base URL configured.
    #[error("[Backend Service] missing base URL for {backend} backend ({var})")]
    MissingBaseUrl {
        /// Backend that was selected.
        backend: BackendKey,
        /// Environment variable that should carry its base URL.
        var: &'static str,
    },

    /// A backend selector outside of the known set.
    #[error("[Backend Service] unknown backend: {0}")]
    UnknownBackend(String),

    /// A number failed to parse (like timeouts).
    #[error("[Backend Service] invalid number in {var}: {reason}")]
    InvalidNumber {
        /// Variable name (e.g., `BACKEND_TIMEOUT_SECS`).
        var: &'static str,
        /// Human-readable reason (e.g., `expected u64`).
        reason: &'static str,
    },

    /// Value had the wrong format (e.g., invalid URL).
    #[error("[Backend Service] invalid format in {var}: {reason}")]
    InvalidFormat {
        /// Variable name (e.g., `PY_API_BASE_URL`).
        var: &'static str,
        /// Explanation (e.g., `must start with http:// or https://`).
        reason: &'static str,
    },
}

/* ------------------------------------------------------------------------- */
/* Upstream errors                                                           */
/* ------------------------------------------------------------------------- */

/// Failures of a single backend call.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The backend could not be reached (connect, DNS, timeout, body read).
    #[error("[Backend Service] unable to reach {backend} backend: {reason}")]
    Unreachable { backend: BackendKey, reason: String },

    /// The backend answered with a body that is not JSON.
    #[error("[Backend Service] {backend} backend returned invalid JSON (HTTP {status}): {reason}")]
    InvalidJson {
        backend: BackendKey,
        status: StatusCode,
        reason: String,
    },

    /// The backend answered with a non-successful status.
    #[error("[Backend Service] {backend} backend returned HTTP {status}: {snippet}")]
    Status {
        backend: BackendKey,
        status: StatusCode,
        /// Short snippet of the response body (trimmed).
        snippet: String,
    },

    /// JSON was valid but did not match the expected shape.
    #[error("[Backend Service] failed to decode {backend} backend response: {reason}")]
    Decode { backend: BackendKey, reason: String },
}

impl UpstreamError {
    /// Backend the failure belongs to.
    pub fn backend(&self) -> BackendKey {
        match self {
            UpstreamError::Unreachable { backend, .. }
            | UpstreamError::InvalidJson { backend, .. }
            | UpstreamError::Status { backend, .. }
            | UpstreamError::Decode { backend, .. } => *backend,
        }
    }

    /// Underlying reason without the crate prefix, suitable for `details.reason`.
    pub fn reason(&self) -> String {
        match self {
            UpstreamError::Unreachable { reason, .. }
            | UpstreamError::InvalidJson { reason, .. }
            | UpstreamError::Decode { reason, .. } => reason.clone(),
            UpstreamError::Status {
                status, snippet, ..
            } => {
                if snippet.is_empty() {
                    format!("HTTP {status}")
                } else {
                    format!("HTTP {status}: {snippet}")
                }
            }
        }
    }
}

/// Trims a response body down to a log-friendly snippet.
pub fn make_snippet(text: &str) -> String {
    text.trim().chars().take(240).collect()
}

/// Flattens a transport error and its source chain into one line.
pub fn transport_reason(err: &reqwest::Error) -> String {
    let mut reason = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        let text = inner.to_string();
        if !reason.contains(&text) {
            reason.push_str(": ");
            reason.push_str(&text);
        }
        source = inner.source();
    }
    reason
}

/* ------------------------------------------------------------------------- */
/* Env helpers (return unified `Result<T>`)                                  */
/* ------------------------------------------------------------------------- */

/// Fetches a required, non-empty environment variable.
///
/// # Errors
/// Returns [`BackendServiceError::Config`] with [`ConfigError::MissingVar`] if
/// the variable is absent or empty.
pub fn must_env(name: &'static str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(name).into()),
    }
}

/// Reads an optional environment variable (`None` if unset/empty).
pub fn env_opt_string(name: &'static str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses an optional `u64` from env (`Ok(None)` if unset/empty).
///
/// # Errors
/// Returns [`BackendServiceError::Config`] with [`ConfigError::InvalidNumber`]
/// if the variable is set but not a valid `u64`.
pub fn env_opt_u64(name: &'static str) -> Result<Option<u64>> {
    match env_opt_string(name) {
        Some(v) => v.parse::<u64>().map(Some).map_err(|_| {
            BackendServiceError::from(ConfigError::InvalidNumber {
                var: name,
                reason: "expected u64",
            })
        }),
        None => Ok(None),
    }
}

/* ------------------------------------------------------------------------- */
/* Validation helpers                                                        */
/* ------------------------------------------------------------------------- */

/// Validates that an HTTP endpoint starts with `http://` or `https://`.
///
/// # Errors
/// Returns [`BackendServiceError::Config`] with [`ConfigError::InvalidFormat`]
/// when the string does not start with a valid HTTP scheme.
pub fn validate_http_endpoint(var: &'static str, value: &str) -> Result<()> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidFormat {
            var,
            reason: "must start with http:// or https://",
        }
        .into())
    }
}
