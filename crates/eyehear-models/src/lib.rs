//! Shared data models for the EyeHear backend.
//!
//! This crate provides Serde-serializable types for:
//! - Model description payloads and stored description records
//! - Caller identity
//! - Second-precision ingestion timestamps

pub mod description;
pub mod identity;
pub mod ingestion;

// Re-export common types
pub use description::{DescriptionPayload, VideoDescriptionRecord};
pub use identity::CallerIdentity;
pub use ingestion::{format_ingestion_timestamp, ingestion_instant, parse_ingestion_timestamp};
