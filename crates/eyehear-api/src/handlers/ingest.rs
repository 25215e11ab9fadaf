//! Video ingestion handlers.

use std::io::Write;

use axum::extract::{Multipart, State};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::info;

use eyehear_models::format_ingestion_timestamp;

use crate::error::{ApiError, ApiResult};
use crate::pipeline::{PipelineOutcome, PipelineStage, VideoSource};
use crate::state::AppState;

/// Response for both ingestion endpoints.
#[derive(Serialize)]
pub struct IngestResponse {
    /// Second-precision receipt time, fixed before processing.
    pub received_at: String,
    pub description: String,
    pub humans_detected: bool,
    pub animals_detected: bool,
    /// Base64-encoded MP3 narration for immediate playback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    pub stage: PipelineStage,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl From<PipelineOutcome> for IngestResponse {
    fn from(outcome: PipelineOutcome) -> Self {
        Self {
            received_at: format_ingestion_timestamp(&outcome.received_at),
            description: outcome.description.description,
            humans_detected: outcome.description.humans_detected,
            animals_detected: outcome.description.animals_detected,
            audio: outcome.audio.map(|bytes| BASE64.encode(bytes)),
            audio_location: outcome.audio_location,
            record_id: outcome.record_id,
            stage: outcome.stage,
            warnings: outcome.warnings,
        }
    }
}

/// POST /api/videos - ingest an uploaded video.
pub async fn ingest_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<IngestResponse>> {
    let mut upload: Option<(String, NamedTempFile)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or_else(|| ApiError::bad_request("file field has no filename"))?;

        validate_extension(&filename, &state.config.pipeline.allowed_extension)?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("upload read failed: {}", e)))?;

        if bytes.is_empty() {
            return Err(ApiError::bad_request("uploaded video is empty"));
        }

        let mut staged = NamedTempFile::new().map_err(|e| ApiError::internal(e.to_string()))?;
        staged
            .write_all(&bytes)
            .and_then(|_| staged.flush())
            .map_err(|e| ApiError::internal(e.to_string()))?;

        upload = Some((filename, staged));
        break;
    }

    let (filename, staged) = upload.ok_or_else(|| ApiError::bad_request("missing file field"))?;

    info!(video = %filename, "processing uploaded video");

    // Staged file stays alive until the pipeline run completes.
    let outcome = state
        .pipeline
        .run(VideoSource::File {
            path: staged.path().to_path_buf(),
            filename,
        })
        .await?;

    Ok(Json(outcome.into()))
}

/// POST /api/videos/example - run the canned example video.
pub async fn ingest_example(State(state): State<AppState>) -> ApiResult<Json<IngestResponse>> {
    let url = state.config.pipeline.example_video_url.clone();
    let filename = url
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("example.mp4")
        .to_string();

    info!(url = %url, "processing example video");

    let outcome = state
        .pipeline
        .run(VideoSource::Url { url, filename })
        .await?;

    Ok(Json(outcome.into()))
}

fn validate_extension(filename: &str, allowed: &str) -> ApiResult<()> {
    let matches = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(allowed))
        .unwrap_or(false);

    if matches {
        Ok(())
    } else {
        Err(ApiError::unsupported_media(format!(
            "only .{} uploads are accepted, got {:?}",
            allowed, filename
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_mp4_uploads() {
        assert!(validate_extension("front_door.mp4", "mp4").is_ok());
        assert!(validate_extension("FRONT_DOOR.MP4", "mp4").is_ok());
    }

    #[test]
    fn rejects_other_extensions() {
        assert!(validate_extension("clip.mov", "mp4").is_err());
        assert!(validate_extension("clip", "mp4").is_err());
        assert!(validate_extension("clip.mp4.exe", "mp4").is_err());
    }
}
