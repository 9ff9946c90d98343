//! Backend base URLs and HTTP timeouts, loaded from environment variables.
//!
//! # Environment variables
//!
//! - `PY_API_BASE_URL`      = Python backend base URL (optional at startup)
//! - `JAVA_API_BASE_URL`    = Java backend base URL (optional at startup)
//! - `BACKEND_TIMEOUT_SECS` = outbound request timeout, default 30
//! - `HEALTH_TIMEOUT_SECS`  = health probe timeout, default 5
//!
//! A backend without a base URL is not a startup failure: requests that select
//! it fail individually with [`ConfigError::MissingBaseUrl`].

use crate::{
    config::backend_key::BackendKey,
    error_handler::{ConfigError, Result, env_opt_string, env_opt_u64, validate_http_endpoint},
};

/// Default outbound timeout for backend calls.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default timeout for health probes.
pub const DEFAULT_HEALTH_TIMEOUT_SECS: u64 = 5;

/// Resolved configuration for both backends.
///
/// Built once at startup and injected into [`crate::RagBackendService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Base URL of the Python backend, without trailing slash.
    pub python_base_url: Option<String>,
    /// Base URL of the Java backend, without trailing slash.
    pub java_base_url: Option<String>,
    /// Timeout applied to every query/runs call.
    pub timeout_secs: u64,
    /// Timeout applied to health probes.
    pub health_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            python_base_url: None,
            java_base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            health_timeout_secs: DEFAULT_HEALTH_TIMEOUT_SECS,
        }
    }
}

impl BackendConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    /// - [`ConfigError::InvalidFormat`] if a base URL lacks an http/https scheme
    /// - [`ConfigError::InvalidNumber`] if a timeout is not a valid `u64`
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        for backend in BackendKey::ALL {
            let var = backend.base_url_var();
            if let Some(url) = env_opt_string(var) {
                validate_http_endpoint(var, &url)?;
                cfg = cfg.with_base_url(backend, url);
            }
        }

        if let Some(secs) = env_opt_u64("BACKEND_TIMEOUT_SECS")? {
            cfg.timeout_secs = secs;
        }
        if let Some(secs) = env_opt_u64("HEALTH_TIMEOUT_SECS")? {
            cfg.health_timeout_secs = secs;
        }

        Ok(cfg)
    }

    /// Sets the base URL for one backend. Trailing slashes are dropped.
    pub fn with_base_url(mut self, backend: BackendKey, url: impl Into<String>) -> Self {
        let url = url.into().trim().trim_end_matches('/').to_string();
        let slot = match backend {
            BackendKey::Python => &mut self.python_base_url,
            BackendKey::Java => &mut self.java_base_url,
        };
        *slot = Some(url).filter(|u| !u.is_empty());
        self
    }

    /// Resolves the base URL of a backend.
    ///
    /// # Errors
    /// [`ConfigError::MissingBaseUrl`] naming the variable that should hold it.
    pub fn base_url(&self, backend: BackendKey) -> std::result::Result<&str, ConfigError> {
        let slot = match backend {
            BackendKey::Python => &self.python_base_url,
            BackendKey::Java => &self.java_base_url,
        };
        slot.as_deref().ok_or(ConfigError::MissingBaseUrl {
            backend,
            var: backend.base_url_var(),
        })
    }

    /// Backends that have a base URL.
    pub fn configured(&self) -> Vec<BackendKey> {
        BackendKey::ALL
            .into_iter()
            .filter(|b| self.base_url(*b).is_ok())
            .collect()
    }
}
