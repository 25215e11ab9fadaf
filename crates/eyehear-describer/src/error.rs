//! Error types for the describer crate.

use thiserror::Error;

pub type DescriberResult<T> = Result<T, DescriberError>;

#[derive(Error, Debug)]
pub enum DescriberError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Describer request failed: {0}")]
    RequestFailed(String),

    #[error("Media processing failed: {0}")]
    MediaProcessingFailed(String),

    #[error("Malformed model response: {0}")]
    MalformedModelResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DescriberError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn media_failed(msg: impl Into<String>) -> Self {
        Self::MediaProcessingFailed(msg.into())
    }

    pub fn malformed_response(msg: impl Into<String>) -> Self {
        Self::MalformedModelResponse(msg.into())
    }
}
