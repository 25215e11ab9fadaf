//! Video description via Google's Gemini API.
//!
//! Uploads a video through the Files API, waits for server-side
//! processing, then asks the model for a structured JSON description.

pub mod client;
pub mod error;
pub mod prompt;

pub use client::{DescriberClient, DescriberConfig};
pub use error::{DescriberError, DescriberResult};
