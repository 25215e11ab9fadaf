//! Text-to-speech synthesis via the Google Translate TTS endpoint.
//!
//! The endpoint caps input length per request, so long descriptions are
//! split on whitespace into bounded chunks. Each chunk comes back as a
//! standalone MP3 stream; concatenating the streams yields a playable
//! narration because MPEG audio frames are self-delimiting.

pub mod chunk;
pub mod client;
pub mod error;

pub use chunk::split_text;
pub use client::{SpeechClient, SpeechConfig};
pub use error::{SpeechError, SpeechResult};
