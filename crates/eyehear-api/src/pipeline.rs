//! Video description pipeline.
//!
//! Drives one video from receipt through description, speech synthesis,
//! and persistence. The stages run strictly in order:
//!
//!   Received -> Described -> Synthesized -> Stored
//!
//! The ingestion timestamp is fixed once, at receipt. A description
//! failure aborts the run. Later failures degrade instead: the caller
//! still gets the description text, plus a warning naming what was
//! lost. The description record is only written after the audio object
//! is confirmed in storage, so no record ever points at missing audio.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use eyehear_describer::{DescriberClient, DescriberError};
use eyehear_firestore::{DescriptionRepository, FirestoreError};
use eyehear_models::{ingestion_instant, CallerIdentity, DescriptionPayload, VideoDescriptionRecord};
use eyehear_speech::{SpeechClient, SpeechError};
use eyehear_storage::{StorageClient, StorageError};

use crate::error::{ApiError, ApiResult};
use crate::metrics;

/// Seam for the description backend.
#[async_trait]
pub trait DescribeVideo: Send + Sync {
    async fn describe_file(&self, path: &Path) -> Result<DescriptionPayload, DescriberError>;
    async fn describe_url(&self, url: &str) -> Result<DescriptionPayload, DescriberError>;
}

/// Seam for the speech backend.
#[async_trait]
pub trait SynthesizeSpeech: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeechError>;
}

/// Seam for persistence of audio objects and description records.
#[async_trait]
pub trait StoreArtifacts: Send + Sync {
    async fn store_audio(
        &self,
        audio: &[u8],
        caller: &CallerIdentity,
        video_filename: &str,
    ) -> Result<String, StorageError>;

    async fn insert_record(&self, record: &VideoDescriptionRecord)
        -> Result<String, FirestoreError>;
}

#[async_trait]
impl DescribeVideo for DescriberClient {
    async fn describe_file(&self, path: &Path) -> Result<DescriptionPayload, DescriberError> {
        DescriberClient::describe_file(self, path).await
    }

    async fn describe_url(&self, url: &str) -> Result<DescriptionPayload, DescriberError> {
        DescriberClient::describe_url(self, url).await
    }
}

#[async_trait]
impl SynthesizeSpeech for SpeechClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeechError> {
        SpeechClient::synthesize(self, text).await
    }
}

/// Production artifact store: S3-compatible audio objects plus
/// Firestore description records.
pub struct ArtifactStore {
    storage: Arc<StorageClient>,
    repo: Arc<DescriptionRepository>,
}

impl ArtifactStore {
    pub fn new(storage: Arc<StorageClient>, repo: Arc<DescriptionRepository>) -> Self {
        Self { storage, repo }
    }
}

#[async_trait]
impl StoreArtifacts for ArtifactStore {
    async fn store_audio(
        &self,
        audio: &[u8],
        caller: &CallerIdentity,
        video_filename: &str,
    ) -> Result<String, StorageError> {
        self.storage.store_audio(audio, caller, video_filename).await
    }

    async fn insert_record(
        &self,
        record: &VideoDescriptionRecord,
    ) -> Result<String, FirestoreError> {
        self.repo.insert(record).await
    }
}

/// Where the video bytes come from.
#[derive(Debug, Clone)]
pub enum VideoSource {
    /// An uploaded file already staged on local disk.
    File { path: PathBuf, filename: String },
    /// A remote video fetched by URL.
    Url { url: String, filename: String },
}

impl VideoSource {
    fn filename(&self) -> &str {
        match self {
            VideoSource::File { filename, .. } => filename,
            VideoSource::Url { filename, .. } => filename,
        }
    }
}

/// How far a pipeline run progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Received,
    Described,
    Synthesized,
    Stored,
}

/// Result of one pipeline run.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// Fixed at receipt, before any processing.
    pub received_at: DateTime<Utc>,
    pub description: DescriptionPayload,
    /// Synthesized narration, when synthesis succeeded.
    pub audio: Option<Vec<u8>>,
    /// `bucket/key` of the stored audio object, when storage succeeded.
    pub audio_location: Option<String>,
    /// Document id of the stored description record.
    pub record_id: Option<String>,
    pub stage: PipelineStage,
    /// Human-readable notes about degraded stages.
    pub warnings: Vec<String>,
}

/// Orchestrator for the receive/describe/synthesize/store flow.
pub struct Pipeline {
    describer: Arc<dyn DescribeVideo>,
    speech: Arc<dyn SynthesizeSpeech>,
    store: Arc<dyn StoreArtifacts>,
    caller: CallerIdentity,
}

impl Pipeline {
    pub fn new(
        describer: Arc<dyn DescribeVideo>,
        speech: Arc<dyn SynthesizeSpeech>,
        store: Arc<dyn StoreArtifacts>,
        caller: CallerIdentity,
    ) -> Self {
        Self {
            describer,
            speech,
            store,
            caller,
        }
    }

    /// Run one video through the pipeline.
    pub async fn run(&self, source: VideoSource) -> ApiResult<PipelineOutcome> {
        let received_at = ingestion_instant();
        let filename = source.filename().to_string();
        let mut warnings = Vec::new();

        info!(video = %filename, user = %self.caller, "video received");

        let describe_start = Instant::now();
        let description = match &source {
            VideoSource::File { path, .. } => self.describer.describe_file(path).await,
            VideoSource::Url { url, .. } => self.describer.describe_url(url).await,
        }
        .map_err(|e| {
            error!(video = %filename, "description failed: {}", e);
            metrics::record_pipeline_failure("describe");
            ApiError::from(e)
        })?;
        metrics::record_stage_duration("describe", describe_start.elapsed().as_secs_f64());

        let mut stage = PipelineStage::Described;

        let audio = match self.speech.synthesize(&description.description).await {
            Ok(bytes) => {
                stage = PipelineStage::Synthesized;
                Some(bytes)
            }
            Err(e) => {
                warn!(video = %filename, "speech synthesis failed: {}", e);
                metrics::record_pipeline_failure("synthesize");
                warnings.push(format!("speech synthesis failed: {}", e));
                None
            }
        };

        // Nothing to persist without audio: the record must reference a
        // stored audio object.
        let (audio_location, record_id) = match &audio {
            Some(bytes) => self
                .persist(bytes, &filename, &description, received_at, &mut warnings)
                .await,
            None => (None, None),
        };

        if record_id.is_some() {
            stage = PipelineStage::Stored;
            metrics::record_video_processed();
        }

        Ok(PipelineOutcome {
            received_at,
            description,
            audio,
            audio_location,
            record_id,
            stage,
            warnings,
        })
    }

    /// Persist the audio object, then the description record.
    ///
    /// Ordering is deliberate: the record is written only once the
    /// audio upload has been confirmed.
    async fn persist(
        &self,
        audio: &[u8],
        filename: &str,
        description: &DescriptionPayload,
        received_at: DateTime<Utc>,
        warnings: &mut Vec<String>,
    ) -> (Option<String>, Option<String>) {
        let audio_location = match self.store.store_audio(audio, &self.caller, filename).await {
            Ok(location) => location,
            Err(e) => {
                warn!(video = %filename, "audio storage failed: {}", e);
                metrics::record_pipeline_failure("store_audio");
                warnings.push(format!("audio storage failed: {}", e));
                return (None, None);
            }
        };

        let record = VideoDescriptionRecord::new(
            description.clone(),
            &self.caller,
            received_at,
            audio_location.clone(),
        );

        match self.store.insert_record(&record).await {
            Ok(doc_id) => (Some(audio_location), Some(doc_id)),
            Err(e) => {
                warn!(video = %filename, "record insert failed: {}", e);
                metrics::record_pipeline_failure("insert_record");
                warnings.push(format!("description record not stored: {}", e));
                (Some(audio_location), None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        Describer {}

        #[async_trait]
        impl DescribeVideo for Describer {
            async fn describe_file(&self, path: &Path) -> Result<DescriptionPayload, DescriberError>;
            async fn describe_url(&self, url: &str) -> Result<DescriptionPayload, DescriberError>;
        }
    }

    mock! {
        Speech {}

        #[async_trait]
        impl SynthesizeSpeech for Speech {
            async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeechError>;
        }
    }

    mock! {
        Store {}

        #[async_trait]
        impl StoreArtifacts for Store {
            async fn store_audio(
                &self,
                audio: &[u8],
                caller: &CallerIdentity,
                video_filename: &str,
            ) -> Result<String, StorageError>;

            async fn insert_record(
                &self,
                record: &VideoDescriptionRecord,
            ) -> Result<String, FirestoreError>;
        }
    }

    fn payload() -> DescriptionPayload {
        DescriptionPayload {
            description: "A visitor rings and waits.".to_string(),
            humans_detected: true,
            animals_detected: false,
        }
    }

    fn file_source() -> VideoSource {
        VideoSource::File {
            path: PathBuf::from("/tmp/clip.mp4"),
            filename: "clip.mp4".to_string(),
        }
    }

    fn pipeline(
        describer: MockDescriber,
        speech: MockSpeech,
        store: MockStore,
    ) -> Pipeline {
        Pipeline::new(
            Arc::new(describer),
            Arc::new(speech),
            Arc::new(store),
            CallerIdentity::guest(),
        )
    }

    #[tokio::test]
    async fn full_run_reaches_stored() {
        let mut describer = MockDescriber::new();
        describer
            .expect_describe_file()
            .returning(|_| Ok(payload()));

        let mut speech = MockSpeech::new();
        speech
            .expect_synthesize()
            .with(eq("A visitor rings and waits."))
            .returning(|_| Ok(b"mp3".to_vec()));

        let mut store = MockStore::new();
        store
            .expect_store_audio()
            .returning(|_, _, _| Ok("bucket/audio/u/clip.mp3".to_string()));
        store
            .expect_insert_record()
            .withf(|record| {
                record.audio_location == "bucket/audio/u/clip.mp3"
                    && record.user_id == eyehear_models::identity::GUEST_USER_ID
            })
            .returning(|_| Ok("doc-1".to_string()));

        let outcome = pipeline(describer, speech, store)
            .run(file_source())
            .await
            .unwrap();

        assert_eq!(outcome.stage, PipelineStage::Stored);
        assert_eq!(outcome.audio.as_deref(), Some(b"mp3".as_slice()));
        assert_eq!(outcome.audio_location.as_deref(), Some("bucket/audio/u/clip.mp3"));
        assert_eq!(outcome.record_id.as_deref(), Some("doc-1"));
        assert!(outcome.warnings.is_empty());
    }

    #[tokio::test]
    async fn description_failure_aborts_the_run() {
        let mut describer = MockDescriber::new();
        describer.expect_describe_file().returning(|_| {
            Err(DescriberError::malformed_response("no candidates"))
        });

        let mut speech = MockSpeech::new();
        speech.expect_synthesize().never();

        let mut store = MockStore::new();
        store.expect_store_audio().never();
        store.expect_insert_record().never();

        let err = pipeline(describer, speech, store)
            .run(file_source())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Describer(_)));
    }

    #[tokio::test]
    async fn synthesis_failure_returns_text_and_stores_nothing() {
        let mut describer = MockDescriber::new();
        describer
            .expect_describe_file()
            .returning(|_| Ok(payload()));

        let mut speech = MockSpeech::new();
        speech
            .expect_synthesize()
            .returning(|_| Err(SpeechError::synthesis_failed("endpoint down")));

        let mut store = MockStore::new();
        store.expect_store_audio().never();
        store.expect_insert_record().never();

        let outcome = pipeline(describer, speech, store)
            .run(file_source())
            .await
            .unwrap();

        assert_eq!(outcome.stage, PipelineStage::Described);
        assert_eq!(outcome.description, payload());
        assert!(outcome.audio.is_none());
        assert!(outcome.audio_location.is_none());
        assert!(outcome.record_id.is_none());
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[tokio::test]
    async fn audio_store_failure_suppresses_the_record() {
        let mut describer = MockDescriber::new();
        describer
            .expect_describe_file()
            .returning(|_| Ok(payload()));

        let mut speech = MockSpeech::new();
        speech
            .expect_synthesize()
            .returning(|_| Ok(b"mp3".to_vec()));

        let mut store = MockStore::new();
        store
            .expect_store_audio()
            .returning(|_, _, _| Err(StorageError::upload_failed("bucket unreachable")));
        store.expect_insert_record().never();

        let outcome = pipeline(describer, speech, store)
            .run(file_source())
            .await
            .unwrap();

        assert_eq!(outcome.stage, PipelineStage::Synthesized);
        assert!(outcome.audio.is_some());
        assert!(outcome.audio_location.is_none());
        assert!(outcome.record_id.is_none());
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[tokio::test]
    async fn record_failure_still_reports_the_audio_location() {
        let mut describer = MockDescriber::new();
        describer
            .expect_describe_file()
            .returning(|_| Ok(payload()));

        let mut speech = MockSpeech::new();
        speech
            .expect_synthesize()
            .returning(|_| Ok(b"mp3".to_vec()));

        let mut store = MockStore::new();
        store
            .expect_store_audio()
            .returning(|_, _, _| Ok("bucket/audio/u/clip.mp3".to_string()));
        store
            .expect_insert_record()
            .returning(|_| Err(FirestoreError::ServerError(503, "unavailable".to_string())));

        let outcome = pipeline(describer, speech, store)
            .run(file_source())
            .await
            .unwrap();

        assert_eq!(outcome.stage, PipelineStage::Synthesized);
        assert_eq!(outcome.audio_location.as_deref(), Some("bucket/audio/u/clip.mp3"));
        assert!(outcome.record_id.is_none());
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[tokio::test]
    async fn url_source_goes_through_describe_url() {
        let mut describer = MockDescriber::new();
        describer
            .expect_describe_url()
            .with(eq("https://example.com/clip.mp4"))
            .returning(|_| Ok(payload()));
        describer.expect_describe_file().never();

        let mut speech = MockSpeech::new();
        speech
            .expect_synthesize()
            .returning(|_| Ok(b"mp3".to_vec()));

        let mut store = MockStore::new();
        store
            .expect_store_audio()
            .with(
                mockall::predicate::always(),
                mockall::predicate::always(),
                eq("clip.mp4"),
            )
            .returning(|_, _, _| Ok("bucket/audio/u/clip.mp3".to_string()));
        store
            .expect_insert_record()
            .returning(|_| Ok("doc-2".to_string()));

        let outcome = pipeline(describer, speech, store)
            .run(VideoSource::Url {
                url: "https://example.com/clip.mp4".to_string(),
                filename: "clip.mp4".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(outcome.stage, PipelineStage::Stored);
    }

    #[tokio::test]
    async fn timestamp_is_fixed_before_description() {
        let mut describer = MockDescriber::new();
        describer.expect_describe_file().returning(|_| {
            std::thread::sleep(std::time::Duration::from_millis(1100));
            Ok(payload())
        });

        let mut speech = MockSpeech::new();
        speech
            .expect_synthesize()
            .returning(|_| Err(SpeechError::synthesis_failed("skip persistence")));

        let store = MockStore::new();

        let before = ingestion_instant();
        let outcome = pipeline(describer, speech, store)
            .run(file_source())
            .await
            .unwrap();

        // Within a second of receipt despite the slow description stage.
        let delta = (outcome.received_at - before).num_seconds().abs();
        assert!(delta <= 1, "timestamp drifted by {}s", delta);
    }
}
