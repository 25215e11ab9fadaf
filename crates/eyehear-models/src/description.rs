//! Video description models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::CallerIdentity;
use crate::ingestion::format_ingestion_timestamp;

/// Structured description returned by the generative model.
///
/// The model is instructed to answer with exactly this JSON schema;
/// unknown fields are rejected so schema drift surfaces as a parse
/// error rather than silently dropped data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DescriptionPayload {
    /// Free-text description of the video contents.
    pub description: String,

    /// Whether the model observed any people.
    pub humans_detected: bool,

    /// Whether the model observed any animals.
    pub animals_detected: bool,
}

/// A stored description record, one per processed video.
///
/// Immutable after creation: insert-only, no update or delete path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDescriptionRecord {
    /// Model-produced description text.
    pub description: String,

    /// Model-asserted presence of people.
    pub humans_detected: bool,

    /// Model-asserted presence of animals.
    pub animals_detected: bool,

    /// Identity of the submitting user.
    pub user_id: String,

    /// Ingestion instant, assigned once when the video was accepted.
    pub timestamp: DateTime<Utc>,

    /// Object-storage location of the synthesized speech artifact.
    /// References an object confirmed written before this record.
    pub audio_location: String,
}

impl VideoDescriptionRecord {
    /// Build a record from a parsed payload and pipeline context.
    pub fn new(
        payload: DescriptionPayload,
        caller: &CallerIdentity,
        timestamp: DateTime<Utc>,
        audio_location: impl Into<String>,
    ) -> Self {
        Self {
            description: payload.description,
            humans_detected: payload.humans_detected,
            animals_detected: payload.animals_detected,
            user_id: caller.user_id().to_string(),
            timestamp,
            audio_location: audio_location.into(),
        }
    }

    /// The canonical string form of the ingestion timestamp.
    pub fn timestamp_string(&self) -> String {
        format_ingestion_timestamp(&self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::ingestion_instant;

    fn sample_payload() -> DescriptionPayload {
        DescriptionPayload {
            description: "A person in a red coat walks past.".to_string(),
            humans_detected: true,
            animals_detected: false,
        }
    }

    #[test]
    fn test_payload_parses_strict_json() {
        let json = r#"{"description": "A cat sits on the porch.", "humans_detected": false, "animals_detected": true}"#;
        let payload: DescriptionPayload = serde_json::from_str(json).unwrap();
        assert!(!payload.humans_detected);
        assert!(payload.animals_detected);
    }

    #[test]
    fn test_payload_rejects_unknown_fields() {
        let json = r#"{"description": "x", "humans_detected": true, "animals_detected": false, "extra": 1}"#;
        assert!(serde_json::from_str::<DescriptionPayload>(json).is_err());
    }

    #[test]
    fn test_payload_rejects_missing_fields() {
        let json = r#"{"description": "x"}"#;
        assert!(serde_json::from_str::<DescriptionPayload>(json).is_err());
    }

    #[test]
    fn test_record_carries_payload_and_context() {
        let ts = ingestion_instant();
        let record = VideoDescriptionRecord::new(
            sample_payload(),
            &CallerIdentity::guest(),
            ts,
            "bucket/audio/guest/front_door.mp3",
        );

        assert_eq!(record.timestamp, ts);
        assert_eq!(record.user_id, CallerIdentity::guest().user_id());
        assert!(record.audio_location.ends_with(".mp3"));
        assert!(record.humans_detected);
    }
}
