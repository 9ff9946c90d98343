use backend_service::{
    BackendConfig, BackendServiceError, RagBackendService, error_handler::must_env,
};
use thiserror::Error;
use tracing::warn;

/// Startup configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error(transparent)]
    Backend(#[from] BackendServiceError),
}

/// Process-wide configuration of the proxy.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Listen address, e.g. "0.0.0.0:3000".
    pub api_address: String,
    /// Base URLs and timeouts of the RAG backends.
    pub backends: BackendConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_address = must_env("API_ADDRESS").map_err(|_| ConfigError::MissingVar("API_ADDRESS"))?;
        let backends = BackendConfig::from_env()?;

        for backend in backend_service::BackendKey::ALL {
            if backends.base_url(backend).is_err() {
                warn!(
                    backend = %backend,
                    var = backend.base_url_var(),
                    "backend base URL not configured; requests to it will fail with INTERNAL_ERROR"
                );
            }
        }

        Ok(Self {
            api_address,
            backends,
        })
    }
}

/// Shared state for all HTTP handlers.
///
/// Holds configuration and the backend client only; nothing per request.
pub struct AppState {
    pub config: AppConfig,
    /// Client for the python/java backends.
    pub backends: RagBackendService,
}

impl AppState {
    /// Build state from an explicit configuration.
    pub fn new(config: AppConfig) -> Result<Self, ConfigError> {
        let backends = RagBackendService::new(config.backends.clone())?;
        Ok(Self { config, backends })
    }

    /// Load shared state from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(AppConfig::from_env()?)
    }
}
