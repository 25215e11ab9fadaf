//! Translate TTS client.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info};

use crate::chunk::{split_text, MAX_CHUNK_CHARS};
use crate::error::{SpeechError, SpeechResult};

const DEFAULT_BASE_URL: &str = "https://translate.google.com";
const DEFAULT_LANG: &str = "en";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for the speech client.
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// TTS endpoint base URL (overridable for tests)
    pub base_url: String,
    /// BCP-47 language tag for the synthesized voice
    pub lang: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            lang: DEFAULT_LANG.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl SpeechConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("TTS_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            lang: std::env::var("TTS_LANG").unwrap_or_else(|_| DEFAULT_LANG.to_string()),
            timeout: std::env::var("TTS_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        }
    }
}

/// Client that turns description text into MP3 narration.
pub struct SpeechClient {
    config: SpeechConfig,
    client: Client,
}

impl SpeechClient {
    /// Create a new speech client.
    pub fn new(config: SpeechConfig) -> SpeechResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SpeechError::config_error(format!("HTTP client build failed: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables.
    pub fn from_env() -> SpeechResult<Self> {
        Self::new(SpeechConfig::from_env())
    }

    /// Synthesize narration for the given text, returning MP3 bytes.
    pub async fn synthesize(&self, text: &str) -> SpeechResult<Vec<u8>> {
        let chunks = split_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(SpeechError::EmptyInput);
        }

        debug!(chunks = chunks.len(), "synthesizing narration");

        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let bytes = self.fetch_chunk(chunk, idx, chunks.len()).await?;
            audio.extend_from_slice(&bytes);
        }

        info!(bytes = audio.len(), "narration synthesized");
        Ok(audio)
    }

    async fn fetch_chunk(&self, text: &str, idx: usize, total: usize) -> SpeechResult<Vec<u8>> {
        let url = format!(
            "{}/translate_tts?ie=UTF-8&client=tw-ob&tl={}&q={}&textlen={}&idx={}&total={}",
            self.config.base_url,
            self.config.lang,
            urlencoding::encode(text),
            text.chars().count(),
            idx,
            total
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SpeechError::synthesis_failed(format!("TTS request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SpeechError::synthesis_failed(format!(
                "TTS endpoint returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SpeechError::synthesis_failed(format!("TTS body read failed: {}", e)))?;

        if bytes.is_empty() {
            return Err(SpeechError::synthesis_failed("TTS endpoint returned no audio"));
        }

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> SpeechConfig {
        SpeechConfig {
            base_url,
            lang: "en".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn short_text_yields_one_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_tts"))
            .and(query_param("tl", "en"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"MP3A".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let client = SpeechClient::new(test_config(server.uri())).unwrap();
        let audio = client.synthesize("A short description.").await.unwrap();
        assert_eq!(audio, b"MP3A");
    }

    #[tokio::test]
    async fn long_text_concatenates_chunk_audio() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_tts"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"X".to_vec()))
            .mount(&server)
            .await;

        let long_text = "word ".repeat(200);
        let expected_chunks = split_text(&long_text, MAX_CHUNK_CHARS).len();
        assert!(expected_chunks > 1);

        let client = SpeechClient::new(test_config(server.uri())).unwrap();
        let audio = client.synthesize(&long_text).await.unwrap();
        assert_eq!(audio.len(), expected_chunks);
    }

    #[tokio::test]
    async fn empty_text_is_rejected_without_a_request() {
        let server = MockServer::start().await;
        let client = SpeechClient::new(test_config(server.uri())).unwrap();
        let err = client.synthesize("   ").await.unwrap_err();
        assert!(matches!(err, SpeechError::EmptyInput));
    }

    #[tokio::test]
    async fn endpoint_failure_surfaces_as_synthesis_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_tts"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = SpeechClient::new(test_config(server.uri())).unwrap();
        let err = client.synthesize("some text").await.unwrap_err();
        assert!(matches!(err, SpeechError::SynthesisFailed(_)));
    }

    #[tokio::test]
    async fn empty_audio_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_tts"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(Vec::new()))
            .mount(&server)
            .await;

        let client = SpeechClient::new(test_config(server.uri())).unwrap();
        let err = client.synthesize("some text").await.unwrap_err();
        assert!(matches!(err, SpeechError::SynthesisFailed(_)));
    }
}
