//! Ingestion timestamp handling.
//!
//! Every submission is stamped once, at the moment the video is
//! accepted, with a second-precision UTC instant. The same instant is
//! carried unchanged through the pipeline and into the stored record.

use chrono::{DateTime, SubsecRound, Utc};

/// Format stored in Firestore and rendered to clients.
///
/// Seconds-precision ISO-8601 without a fractional part, e.g.
/// `2024-08-08T16:15:00`. Lexicographic order matches chronological
/// order, which the history query relies on.
const INGESTION_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Capture the ingestion instant for a new submission.
///
/// Truncated to whole seconds so the formatted value round-trips
/// exactly.
pub fn ingestion_instant() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Format an ingestion instant as the canonical record string.
pub fn format_ingestion_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(INGESTION_FORMAT).to_string()
}

/// Parse a stored ingestion timestamp back to a UTC instant.
pub fn parse_ingestion_timestamp(s: &str) -> Option<DateTime<Utc>> {
    chrono::NaiveDateTime::parse_from_str(s, INGESTION_FORMAT)
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_ingestion_instant_has_no_subseconds() {
        let ts = ingestion_instant();
        assert_eq!(ts.nanosecond(), 0);
    }

    #[test]
    fn test_format_round_trips() {
        let ts = ingestion_instant();
        let formatted = format_ingestion_timestamp(&ts);
        let parsed = parse_ingestion_timestamp(&formatted).unwrap();
        assert_eq!(parsed, ts);
    }

    #[test]
    fn test_format_is_seconds_precision() {
        let ts = parse_ingestion_timestamp("2024-08-08T16:15:00").unwrap();
        assert_eq!(format_ingestion_timestamp(&ts), "2024-08-08T16:15:00");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_ingestion_timestamp("not a timestamp").is_none());
        assert!(parse_ingestion_timestamp("").is_none());
    }
}
