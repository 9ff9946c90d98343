//! Shared client library for the RagLab backends.
//!
//! Two interchangeable RAG backends (`python` and `java`) expose the same REST
//! contract. This crate owns everything the proxy and the terminal client need
//! to talk to them:
//!
//! - [`models`]: the wire contract (query request, RAG response, error envelope, query runs)
//! - [`config`]: backend keys and the env-driven base URL configuration
//! - [`services::rag_backend_service`]: the HTTP client (query, runs, health)
//! - [`runs_aggregator`]: result-per-source fan-out over both backends
//! - [`error_handler`]: unified error types
//! - [`telemetry`]: crate-scoped tracing layer

pub mod config;
pub mod error_handler;
pub mod health_service;
pub mod models;
pub mod runs_aggregator;
pub mod services;
pub mod telemetry;

pub use config::{backend_config::BackendConfig, backend_key::BackendKey};
pub use error_handler::{BackendServiceError, ConfigError, Result, UpstreamError};
pub use services::rag_backend_service::{RagBackendService, UpstreamReply};
