//! Gemini API client for video description.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use eyehear_models::DescriptionPayload;

use crate::error::{DescriberError, DescriberResult};
use crate::prompt;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
const DEFAULT_POLL_DEADLINE_MS: u64 = 120_000;
const VIDEO_MIME_TYPE: &str = "video/mp4";

/// Configuration for the describer client.
#[derive(Debug, Clone)]
pub struct DescriberConfig {
    /// Gemini API key
    pub api_key: String,
    /// Model name, e.g. "gemini-1.5-flash"
    pub model: String,
    /// API base URL (overridable for tests)
    pub base_url: String,
    /// Delay between file-state polls
    pub poll_interval: Duration,
    /// Overall deadline for file processing
    pub poll_deadline: Duration,
}

impl DescriberConfig {
    /// Create config from environment variables.
    pub fn from_env() -> DescriberResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| DescriberError::config_error("GEMINI_API_KEY not set"))?;

        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let base_url =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let poll_interval = std::env::var("DESCRIBER_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);
        let poll_deadline = std::env::var("DESCRIBER_POLL_DEADLINE_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_POLL_DEADLINE_MS);

        Ok(Self {
            api_key,
            model,
            base_url,
            poll_interval: Duration::from_millis(poll_interval),
            poll_deadline: Duration::from_millis(poll_deadline),
        })
    }
}

/// Gemini generateContent request.
#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction")]
    system_instruction: Content,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
    #[serde(rename = "safetySettings")]
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "fileData", skip_serializing_if = "Option::is_none")]
    file_data: Option<FileData>,
}

#[derive(Debug, Serialize)]
struct FileData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    #[serde(rename = "fileUri")]
    file_uri: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "topP")]
    top_p: f32,
    #[serde(rename = "topK")]
    top_k: u32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
            response_mime_type: "application/json".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

fn safety_settings() -> Vec<SafetySetting> {
    const BLOCK_ONLY_HIGH: &str = "BLOCK_ONLY_HIGH";
    [
        "HARM_CATEGORY_DANGEROUS_CONTENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    ]
    .into_iter()
    .map(|category| SafetySetting {
        category,
        threshold: BLOCK_ONLY_HIGH,
    })
    .collect()
}

/// Gemini generateContent response.
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

/// Files API upload/get responses.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: FileHandle,
}

#[derive(Debug, Clone, Deserialize)]
struct FileHandle {
    name: String,
    uri: String,
    state: String,
}

/// Client for describing videos with Gemini.
pub struct DescriberClient {
    config: DescriberConfig,
    client: Client,
    system_instruction: String,
}

impl DescriberClient {
    /// Create a new describer client.
    pub fn new(config: DescriberConfig) -> DescriberResult<Self> {
        Ok(Self {
            config,
            client: Client::new(),
            system_instruction: prompt::system_instruction(),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> DescriberResult<Self> {
        Self::new(DescriberConfig::from_env()?)
    }

    /// Describe a local video file.
    ///
    /// Uploads the file, waits until the server has processed it, then
    /// requests a structured description.
    pub async fn describe_file(&self, path: &Path) -> DescriberResult<DescriptionPayload> {
        let display_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video.mp4")
            .to_string();

        let bytes = tokio::fs::read(path).await?;
        let handle = self.upload_video(&display_name, bytes).await?;
        let handle = self.wait_until_active(handle).await?;
        self.generate_description(&handle.uri).await
    }

    /// Describe a video fetched from a URL.
    ///
    /// The video is downloaded to a scratch file and handed to the same
    /// upload path as local files. The scratch file is removed on every
    /// exit path.
    pub async fn describe_url(&self, url: &str) -> DescriberResult<DescriptionPayload> {
        info!(url = %url, "downloading remote video");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DescriberError::request_failed(format!("video download failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(DescriberError::request_failed(format!(
                "video download returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DescriberError::request_failed(format!("video download failed: {}", e)))?;

        let mut scratch = NamedTempFile::new()?;
        scratch.write_all(&bytes)?;
        scratch.flush()?;

        self.describe_file(scratch.path()).await
    }

    /// Upload video bytes through the Files API resumable protocol.
    async fn upload_video(
        &self,
        display_name: &str,
        bytes: Vec<u8>,
    ) -> DescriberResult<FileHandle> {
        let start_url = format!(
            "{}/upload/v1beta/files?key={}",
            self.config.base_url, self.config.api_key
        );

        debug!(name = %display_name, bytes = bytes.len(), "starting resumable upload");

        let start = self
            .client
            .post(&start_url)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len())
            .header("X-Goog-Upload-Header-Content-Type", VIDEO_MIME_TYPE)
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .send()
            .await
            .map_err(|e| DescriberError::request_failed(format!("upload start failed: {}", e)))?;

        if !start.status().is_success() {
            let status = start.status();
            let body = start.text().await.unwrap_or_default();
            return Err(DescriberError::request_failed(format!(
                "upload start returned {}: {}",
                status, body
            )));
        }

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                DescriberError::request_failed("upload start response missing upload URL")
            })?;

        let finalize = self
            .client
            .post(&upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await
            .map_err(|e| DescriberError::request_failed(format!("upload failed: {}", e)))?;

        if !finalize.status().is_success() {
            let status = finalize.status();
            let body = finalize.text().await.unwrap_or_default();
            return Err(DescriberError::request_failed(format!(
                "upload returned {}: {}",
                status, body
            )));
        }

        let uploaded: UploadResponse = finalize
            .json()
            .await
            .map_err(|e| DescriberError::request_failed(format!("upload response invalid: {}", e)))?;

        info!(file = %uploaded.file.name, state = %uploaded.file.state, "video uploaded");
        Ok(uploaded.file)
    }

    /// Poll the uploaded file until it becomes ACTIVE or the deadline passes.
    async fn wait_until_active(&self, mut handle: FileHandle) -> DescriberResult<FileHandle> {
        let deadline = Instant::now() + self.config.poll_deadline;

        loop {
            match handle.state.as_str() {
                "ACTIVE" => return Ok(handle),
                "FAILED" => {
                    return Err(DescriberError::media_failed(format!(
                        "server-side processing failed for {}",
                        handle.name
                    )))
                }
                state => {
                    if Instant::now() >= deadline {
                        return Err(DescriberError::media_failed(format!(
                            "{} still {} after {:?}",
                            handle.name, state, self.config.poll_deadline
                        )));
                    }
                    debug!(file = %handle.name, state = %state, "waiting for processing");
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }

            let url = format!(
                "{}/v1beta/{}?key={}",
                self.config.base_url, handle.name, self.config.api_key
            );
            handle = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| {
                    DescriberError::request_failed(format!("file state poll failed: {}", e))
                })?
                .json()
                .await
                .map_err(|e| {
                    DescriberError::request_failed(format!("file state response invalid: {}", e))
                })?;
        }
    }

    /// Ask the model for a structured description of the uploaded file.
    async fn generate_description(&self, file_uri: &str) -> DescriberResult<DescriptionPayload> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.config.base_url, self.config.model, self.config.api_key
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: None,
                    file_data: Some(FileData {
                        mime_type: VIDEO_MIME_TYPE.to_string(),
                        file_uri: file_uri.to_string(),
                    }),
                }],
            }],
            system_instruction: Content {
                parts: vec![Part {
                    text: Some(self.system_instruction.clone()),
                    file_data: None,
                }],
            },
            generation_config: GenerationConfig::default(),
            safety_settings: safety_settings(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| DescriberError::request_failed(format!("generateContent failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DescriberError::request_failed(format!(
                "generateContent returned {}: {}",
                status, body
            )));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            DescriberError::malformed_response(format!("response body invalid: {}", e))
        })?;

        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or_else(|| DescriberError::malformed_response("no candidates in response"))?;

        parse_payload(text)
    }
}

/// Parse model output into a description payload, tolerating markdown fences.
fn parse_payload(text: &str) -> DescriberResult<DescriptionPayload> {
    let text = text.trim();
    let text = text.strip_prefix("```json").unwrap_or(text);
    let text = text.strip_prefix("```").unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);

    match serde_json::from_str(text.trim()) {
        Ok(payload) => Ok(payload),
        Err(e) => {
            warn!("model returned unparseable payload: {}", e);
            Err(DescriberError::malformed_response(format!(
                "payload did not match schema: {}",
                e
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> DescriberConfig {
        DescriberConfig {
            api_key: "test-key".to_string(),
            model: "gemini-1.5-flash".to_string(),
            base_url,
            poll_interval: Duration::from_millis(5),
            poll_deadline: Duration::from_millis(100),
        }
    }

    fn payload_json() -> &'static str {
        r#"{"description":"A courier leaves a package.","humans_detected":true,"animals_detected":false}"#
    }

    async fn mock_upload(server: &MockServer, state: &str) {
        Mock::given(method("POST"))
            .and(path("/upload/v1beta/files"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-goog-upload-url", format!("{}/upload-session", server.uri()).as_str()),
            )
            .mount(server)
            .await;

        Mock::given(method("POST"))
            .and(path("/upload-session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "file": {
                    "name": "files/abc123",
                    "uri": "https://example.invalid/files/abc123",
                    "state": state
                }
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn describes_an_active_file() {
        let server = MockServer::start().await;
        mock_upload(&server, "ACTIVE").await;

        Mock::given(method("POST"))
            .and(path_regex(r":generateContent$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "parts": [{ "text": payload_json() }] }
                }]
            })))
            .mount(&server)
            .await;

        let client = DescriberClient::new(test_config(server.uri())).unwrap();
        let scratch = NamedTempFile::new().unwrap();
        std::fs::write(scratch.path(), b"fake mp4 bytes").unwrap();

        let payload = client.describe_file(scratch.path()).await.unwrap();
        assert_eq!(payload.description, "A courier leaves a package.");
        assert!(payload.humans_detected);
        assert!(!payload.animals_detected);
    }

    #[tokio::test]
    async fn polls_until_the_file_is_active() {
        let server = MockServer::start().await;
        mock_upload(&server, "PROCESSING").await;

        Mock::given(method("GET"))
            .and(path("/v1beta/files/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "files/abc123",
                "uri": "https://example.invalid/files/abc123",
                "state": "ACTIVE"
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path_regex(r":generateContent$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "parts": [{ "text": payload_json() }] }
                }]
            })))
            .mount(&server)
            .await;

        let client = DescriberClient::new(test_config(server.uri())).unwrap();
        let scratch = NamedTempFile::new().unwrap();
        std::fs::write(scratch.path(), b"fake mp4 bytes").unwrap();

        assert!(client.describe_file(scratch.path()).await.is_ok());
    }

    #[tokio::test]
    async fn gives_up_when_processing_never_finishes() {
        let server = MockServer::start().await;
        mock_upload(&server, "PROCESSING").await;

        Mock::given(method("GET"))
            .and(path("/v1beta/files/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "files/abc123",
                "uri": "https://example.invalid/files/abc123",
                "state": "PROCESSING"
            })))
            .mount(&server)
            .await;

        let client = DescriberClient::new(test_config(server.uri())).unwrap();
        let scratch = NamedTempFile::new().unwrap();
        std::fs::write(scratch.path(), b"fake mp4 bytes").unwrap();

        let err = client.describe_file(scratch.path()).await.unwrap_err();
        assert!(matches!(err, DescriberError::MediaProcessingFailed(_)));
    }

    #[tokio::test]
    async fn rejects_failed_server_side_processing() {
        let server = MockServer::start().await;
        mock_upload(&server, "FAILED").await;

        let client = DescriberClient::new(test_config(server.uri())).unwrap();
        let scratch = NamedTempFile::new().unwrap();
        std::fs::write(scratch.path(), b"fake mp4 bytes").unwrap();

        let err = client.describe_file(scratch.path()).await.unwrap_err();
        assert!(matches!(err, DescriberError::MediaProcessingFailed(_)));
    }

    #[tokio::test]
    async fn rejects_payload_that_misses_schema_fields() {
        let server = MockServer::start().await;
        mock_upload(&server, "ACTIVE").await;

        Mock::given(method("POST"))
            .and(path_regex(r":generateContent$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "parts": [{ "text": r#"{"description": "no booleans"}"# }] }
                }]
            })))
            .mount(&server)
            .await;

        let client = DescriberClient::new(test_config(server.uri())).unwrap();
        let scratch = NamedTempFile::new().unwrap();
        std::fs::write(scratch.path(), b"fake mp4 bytes").unwrap();

        let err = client.describe_file(scratch.path()).await.unwrap_err();
        assert!(matches!(err, DescriberError::MalformedModelResponse(_)));
    }

    #[test]
    fn parse_strips_markdown_fences() {
        let fenced = format!("```json\n{}\n```", payload_json());
        let payload = parse_payload(&fenced).unwrap();
        assert!(payload.humans_detected);
    }

    #[test]
    fn parse_accepts_bare_json() {
        assert!(parse_payload(payload_json()).is_ok());
    }

    #[test]
    fn parse_rejects_prose() {
        assert!(parse_payload("I could not analyze the video.").is_err());
    }
}
