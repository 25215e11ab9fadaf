//! Firestore REST API client.
//!
//! This crate provides:
//! - A typed repository for video description records
//! - Service account authentication via gcp_auth
//! - Token caching and bounded retry with backoff

pub mod client;
pub mod description_repo;
pub mod error;
pub mod metrics;
pub mod retry;
pub mod token_cache;
pub mod types;

pub use client::{FirestoreClient, FirestoreConfig};
pub use description_repo::DescriptionRepository;
pub use error::{FirestoreError, FirestoreResult};
pub use types::{Document, FromFirestoreValue, ToFirestoreValue, Value};
