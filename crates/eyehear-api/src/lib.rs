//! Axum HTTP API server.
//!
//! This crate provides:
//! - Video ingestion (upload and example) through the description pipeline
//! - Description history for the guest identity
//! - Security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod pipeline;
pub mod routes;
pub mod state;

pub use config::{ApiConfig, PipelineConfig};
pub use error::{ApiError, ApiResult};
pub use pipeline::{Pipeline, PipelineOutcome, PipelineStage};
pub use routes::create_router;
pub use state::AppState;
