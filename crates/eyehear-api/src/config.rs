//! API configuration.

use std::time::Duration;

use eyehear_models::CallerIdentity;

const DEFAULT_EXAMPLE_VIDEO_URL: &str =
    "https://github.com/ThatOrJohn/eye-hear-streamlit/raw/main/examples/Ring_FrontDoor_202408081615.mp4";
const DEFAULT_COLLECTION: &str = "videos";
const DEFAULT_HISTORY_LIMIT: u32 = 20;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Request timeout
    pub request_timeout: Duration,
    /// Max request body size (uploads are whole videos)
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Pipeline settings
    pub pipeline: PipelineConfig,
}

/// Settings that shape the description pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Identity every ingestion runs under
    pub caller: CallerIdentity,
    /// URL of the canned example video
    pub example_video_url: String,
    /// Firestore collection holding description records
    pub collection: String,
    /// Rows returned by the history view
    pub history_limit: u32,
    /// Accepted upload extension
    pub allowed_extension: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            caller: CallerIdentity::guest(),
            example_video_url: DEFAULT_EXAMPLE_VIDEO_URL.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            allowed_extension: "mp4".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            caller: std::env::var("CALLER_USER_ID")
                .map(CallerIdentity::new)
                .unwrap_or_else(|_| CallerIdentity::guest()),
            example_video_url: std::env::var("EXAMPLE_VIDEO_URL")
                .unwrap_or_else(|_| DEFAULT_EXAMPLE_VIDEO_URL.to_string()),
            collection: std::env::var("FIRESTORE_COLLECTION")
                .unwrap_or_else(|_| DEFAULT_COLLECTION.to_string()),
            history_limit: std::env::var("HISTORY_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_HISTORY_LIMIT),
            allowed_extension: "mp4".to_string(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            request_timeout: Duration::from_secs(300),
            max_body_size: 200 * 1024 * 1024, // whole doorbell clips
            environment: "development".to_string(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| vec!["*".to_string()]),
            request_timeout: Duration::from_secs(
                std::env::var("REQUEST_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(200 * 1024 * 1024),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            pipeline: PipelineConfig::from_env(),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pipeline_uses_guest_identity() {
        let config = PipelineConfig::default();
        assert_eq!(config.caller, CallerIdentity::guest());
        assert_eq!(config.collection, "videos");
        assert_eq!(config.history_limit, 20);
    }

    #[test]
    fn default_api_config_is_development() {
        assert!(!ApiConfig::default().is_production());
    }
}
