//! Error types for speech synthesis.

use thiserror::Error;

pub type SpeechResult<T> = Result<T, SpeechError>;

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Speech synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Nothing to synthesize: input text is empty")]
    EmptyInput,
}

impl SpeechError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn synthesis_failed(msg: impl Into<String>) -> Self {
        Self::SynthesisFailed(msg.into())
    }
}
