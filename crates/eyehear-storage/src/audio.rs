//! Audio artifact placement.
//!
//! Synthesized narration is stored under `audio/{user_id}/{stem}.mp3`,
//! where `stem` is the uploaded video's filename without its extension.
//! Callers persist the returned `bucket/key` location alongside the
//! description record.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use eyehear_models::CallerIdentity;

use crate::client::StorageClient;
use crate::error::{StorageError, StorageResult};

const AUDIO_PREFIX: &str = "audio";
const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// Derive the object key for a caller's narration of the given video file.
pub fn audio_object_key(user_id: &str, video_filename: &str) -> StorageResult<String> {
    if user_id.is_empty() || user_id.contains('/') {
        return Err(StorageError::invalid_key(format!(
            "invalid user id {:?}",
            user_id
        )));
    }

    let stem = Path::new(video_filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            StorageError::invalid_key(format!("cannot derive audio name from {:?}", video_filename))
        })?;

    Ok(format!("{}/{}/{}.mp3", AUDIO_PREFIX, user_id, stem))
}

impl StorageClient {
    /// Store synthesized narration audio for a caller.
    ///
    /// Returns the `bucket/key` location on success. The audio is staged
    /// to a scratch file before upload; the scratch file is removed on
    /// every exit path.
    pub async fn store_audio(
        &self,
        audio: &[u8],
        caller: &CallerIdentity,
        video_filename: &str,
    ) -> StorageResult<String> {
        let key = audio_object_key(caller.user_id(), video_filename)?;
        let staged = stage_audio(audio)?;

        debug!(key = %key, bytes = audio.len(), "storing narration audio");
        self.upload_file(staged.path(), &key, AUDIO_CONTENT_TYPE)
            .await?;

        Ok(format!("{}/{}", self.bucket(), key))
    }
}

fn stage_audio(audio: &[u8]) -> StorageResult<NamedTempFile> {
    let mut staged = NamedTempFile::new()?;
    staged.write_all(audio)?;
    staged.flush()?;
    Ok(staged)
}
