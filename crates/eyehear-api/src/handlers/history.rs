//! Description history handler.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use eyehear_models::VideoDescriptionRecord;

use crate::error::ApiResult;
use crate::state::AppState;

/// Column order the history view renders.
const HISTORY_COLUMNS: [&str; 4] = [
    "timestamp",
    "description",
    "humans_detected",
    "animals_detected",
];

/// Tabular history response, newest first.
///
/// The audio location and user id are stored on each record but never
/// shown in the history view.
#[derive(Serialize)]
pub struct HistoryResponse {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// GET /api/history - recent descriptions for the configured identity.
pub async fn get_history(State(state): State<AppState>) -> ApiResult<Json<HistoryResponse>> {
    let records = state
        .repo
        .recent(
            &state.config.pipeline.caller,
            state.config.pipeline.history_limit,
        )
        .await?;

    Ok(Json(records_to_response(records)))
}

fn records_to_response(records: Vec<VideoDescriptionRecord>) -> HistoryResponse {
    let rows = records
        .into_iter()
        .map(|record| {
            vec![
                Value::String(record.timestamp_string()),
                Value::String(record.description),
                Value::Bool(record.humans_detected),
                Value::Bool(record.animals_detected),
            ]
        })
        .collect();

    HistoryResponse {
        columns: HISTORY_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use eyehear_models::{CallerIdentity, DescriptionPayload};

    fn record(description: &str) -> VideoDescriptionRecord {
        VideoDescriptionRecord::new(
            DescriptionPayload {
                description: description.to_string(),
                humans_detected: true,
                animals_detected: false,
            },
            &CallerIdentity::guest(),
            Utc.with_ymd_and_hms(2024, 8, 8, 16, 15, 0).unwrap(),
            "bucket/audio/u/clip.mp3",
        )
    }

    #[test]
    fn response_carries_the_display_columns_in_order() {
        let response = records_to_response(vec![record("a courier arrives")]);
        assert_eq!(
            response.columns,
            vec!["timestamp", "description", "humans_detected", "animals_detected"]
        );
    }

    #[test]
    fn rows_exclude_audio_location_and_user_id() {
        let response = records_to_response(vec![record("a courier arrives")]);
        let row = &response.rows[0];
        assert_eq!(row.len(), 4);
        assert_eq!(row[0], Value::String("2024-08-08T16:15:00".to_string()));
        assert_eq!(row[1], Value::String("a courier arrives".to_string()));
        assert_eq!(row[2], Value::Bool(true));
        assert_eq!(row[3], Value::Bool(false));
    }

    #[test]
    fn empty_history_is_an_empty_table() {
        let response = records_to_response(Vec::new());
        assert!(response.rows.is_empty());
        assert_eq!(response.columns.len(), 4);
    }
}
