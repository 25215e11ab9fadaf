//! Object storage client for the EyeHear backend.
//!
//! Write-only in this system: synthesized audio goes in, nothing is
//! read back. Records in Firestore carry the object location.

pub mod audio;
pub mod client;
pub mod error;

pub use audio::audio_object_key;
pub use client::{StorageClient, StorageConfig};
pub use error::{StorageError, StorageResult};
