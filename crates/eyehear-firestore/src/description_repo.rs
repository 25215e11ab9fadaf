//! Typed repository for video description records.

use std::collections::HashMap;

use tracing::{info, warn};
use uuid::Uuid;

use eyehear_models::{
    format_ingestion_timestamp, parse_ingestion_timestamp, CallerIdentity, VideoDescriptionRecord,
};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{
    CollectionSelector, Document, FieldFilter, FieldReference, Filter, FromFirestoreValue, Order,
    StructuredQuery, ToFirestoreValue, Value,
};

/// Upper bound on rows a history query may return.
pub const MAX_HISTORY_LIMIT: u32 = 100;

/// Repository for description documents in the `videos` collection.
///
/// Insert-only: records are immutable after creation, so there is no
/// update or delete surface.
pub struct DescriptionRepository {
    client: FirestoreClient,
    collection: String,
}

impl DescriptionRepository {
    /// Create a new description repository.
    pub fn new(client: FirestoreClient, collection: impl Into<String>) -> Self {
        Self {
            client,
            collection: collection.into(),
        }
    }

    /// Insert a new description record. Returns the document id.
    pub async fn insert(&self, record: &VideoDescriptionRecord) -> FirestoreResult<String> {
        let doc_id = Uuid::new_v4().to_string();
        let fields = record_to_fields(record);

        self.client
            .create_document(&self.collection, &doc_id, fields)
            .await?;

        info!(
            "Stored description record {} for user {} ({})",
            doc_id,
            record.user_id,
            record.timestamp_string()
        );
        Ok(doc_id)
    }

    /// Most recent records for a caller, newest first.
    ///
    /// The limit is clamped to 1..=MAX_HISTORY_LIMIT. Documents that
    /// fail to parse are skipped with a warning rather than failing
    /// the whole query.
    pub async fn recent(
        &self,
        caller: &CallerIdentity,
        limit: u32,
    ) -> FirestoreResult<Vec<VideoDescriptionRecord>> {
        let query = recent_query(&self.collection, caller, limit);

        // Queries are idempotent, so transient failures get retried.
        let docs = self
            .client
            .with_retry("recent_descriptions", || {
                let query = query.clone();
                async move { self.client.run_query(None, query).await }
            })
            .await?;

        let mut records = Vec::new();
        let mut parse_errors = 0u32;

        for doc in docs {
            let doc_id = doc.doc_id().unwrap_or("").to_string();
            match document_to_record(&doc) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(
                        user_id = %caller.user_id(),
                        doc_id = %doc_id,
                        error = %e,
                        "Failed to parse description document"
                    );
                    parse_errors += 1;
                }
            }
        }

        if parse_errors > 0 {
            warn!(
                user_id = %caller.user_id(),
                parse_errors = parse_errors,
                "Some description documents failed to parse"
            );
        }

        Ok(records)
    }
}

/// Build the history query: records for one caller, newest first,
/// limit clamped to 1..=MAX_HISTORY_LIMIT.
fn recent_query(collection: &str, caller: &CallerIdentity, limit: u32) -> StructuredQuery {
    StructuredQuery {
        from: vec![CollectionSelector {
            collection_id: collection.to_string(),
            all_descendants: None,
        }],
        r#where: Some(Filter {
            composite_filter: None,
            field_filter: Some(FieldFilter {
                field: FieldReference {
                    field_path: "user_id".to_string(),
                },
                op: "EQUAL".to_string(),
                value: Value::StringValue(caller.user_id().to_string()),
            }),
        }),
        order_by: Some(vec![Order {
            field: FieldReference {
                field_path: "timestamp".to_string(),
            },
            direction: "DESCENDING".to_string(),
        }]),
        limit: Some(limit.clamp(1, MAX_HISTORY_LIMIT) as i32),
    }
}

/// Convert a record to Firestore document fields.
///
/// The timestamp is stored as a seconds-precision ISO-8601 string;
/// lexicographic DESCENDING order on it is chronological.
fn record_to_fields(record: &VideoDescriptionRecord) -> HashMap<String, Value> {
    let mut fields = HashMap::new();

    fields.insert(
        "description".to_string(),
        record.description.to_firestore_value(),
    );
    fields.insert(
        "humans_detected".to_string(),
        record.humans_detected.to_firestore_value(),
    );
    fields.insert(
        "animals_detected".to_string(),
        record.animals_detected.to_firestore_value(),
    );
    fields.insert("user_id".to_string(), record.user_id.to_firestore_value());
    fields.insert(
        "timestamp".to_string(),
        format_ingestion_timestamp(&record.timestamp).to_firestore_value(),
    );
    fields.insert(
        "audio_location".to_string(),
        record.audio_location.to_firestore_value(),
    );

    fields
}

fn document_to_record(doc: &Document) -> FirestoreResult<VideoDescriptionRecord> {
    let fields = doc.fields.as_ref().ok_or_else(|| {
        FirestoreError::InvalidResponse(format!(
            "Description document {} has no fields",
            doc.doc_id().unwrap_or("?")
        ))
    })?;

    let get_string = |name: &str| {
        fields
            .get(name)
            .and_then(String::from_firestore_value)
            .ok_or_else(|| {
                FirestoreError::InvalidResponse(format!("Missing or invalid field: {}", name))
            })
    };

    let timestamp_str = get_string("timestamp")?;
    let timestamp = parse_ingestion_timestamp(&timestamp_str).ok_or_else(|| {
        FirestoreError::InvalidResponse(format!("Unparseable timestamp: {}", timestamp_str))
    })?;

    Ok(VideoDescriptionRecord {
        description: get_string("description")?,
        humans_detected: fields
            .get("humans_detected")
            .and_then(bool::from_firestore_value)
            .unwrap_or(false),
        animals_detected: fields
            .get("animals_detected")
            .and_then(bool::from_firestore_value)
            .unwrap_or(false),
        user_id: get_string("user_id")?,
        timestamp,
        audio_location: get_string("audio_location")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyehear_models::{ingestion_instant, DescriptionPayload};

    fn sample_record() -> VideoDescriptionRecord {
        VideoDescriptionRecord::new(
            DescriptionPayload {
                description: "A delivery driver leaves a package.".to_string(),
                humans_detected: true,
                animals_detected: false,
            },
            &CallerIdentity::guest(),
            ingestion_instant(),
            "eyehear-media/audio/guest/front_door.mp3",
        )
    }

    #[test]
    fn test_record_round_trips_through_fields() {
        let record = sample_record();
        let fields = record_to_fields(&record);

        let doc = Document::new(fields);
        let parsed = document_to_record(&doc).unwrap();

        assert_eq!(parsed, record);
    }

    #[test]
    fn test_fields_exclude_nothing_and_invent_nothing() {
        let fields = record_to_fields(&sample_record());
        let mut names: Vec<_> = fields.keys().map(String::as_str).collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                "animals_detected",
                "audio_location",
                "description",
                "humans_detected",
                "timestamp",
                "user_id",
            ]
        );
    }

    #[test]
    fn test_timestamp_stored_as_seconds_string() {
        let record = sample_record();
        let fields = record_to_fields(&record);
        match fields.get("timestamp") {
            Some(Value::StringValue(s)) => {
                assert_eq!(s, &record.timestamp_string());
                assert!(!s.contains('.'));
            }
            other => panic!("unexpected timestamp value: {:?}", other),
        }
    }

    #[test]
    fn test_recent_query_filters_sorts_and_limits() {
        let caller = CallerIdentity::guest();
        let query = recent_query("videos", &caller, 20);

        assert_eq!(query.from.len(), 1);
        assert_eq!(query.from[0].collection_id, "videos");

        let filter = query
            .r#where
            .as_ref()
            .and_then(|f| f.field_filter.as_ref())
            .unwrap();
        assert_eq!(filter.field.field_path, "user_id");
        assert_eq!(filter.op, "EQUAL");
        match &filter.value {
            Value::StringValue(uid) => assert_eq!(uid, caller.user_id()),
            other => panic!("unexpected filter value: {:?}", other),
        }

        let order = &query.order_by.as_ref().unwrap()[0];
        assert_eq!(order.field.field_path, "timestamp");
        assert_eq!(order.direction, "DESCENDING");

        assert_eq!(query.limit, Some(20));
    }

    #[test]
    fn test_recent_query_clamps_limit() {
        let caller = CallerIdentity::guest();
        assert_eq!(recent_query("videos", &caller, 0).limit, Some(1));
        assert_eq!(
            recent_query("videos", &caller, 500).limit,
            Some(MAX_HISTORY_LIMIT as i32)
        );
        assert_eq!(recent_query("videos", &caller, 20).limit, Some(20));
    }

    #[test]
    fn test_document_without_fields_is_rejected() {
        let doc = Document {
            name: Some("projects/p/databases/(default)/documents/videos/x".to_string()),
            fields: None,
            create_time: None,
            update_time: None,
        };
        assert!(document_to_record(&doc).is_err());
    }
}
