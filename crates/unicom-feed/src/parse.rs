//! Tolerant parsing of upstream state-vector arrays.
//!
//! The feed encodes each aircraft as a positional JSON array in which any
//! element may be null. Parsing preserves that optionality field by field —
//! a null never becomes a zero — and drops only records that are unusable at
//! the array level (too short to index).

use crate::client::FeedError;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use unicom_core::RawStateRecord;

// Positional indices in one state vector.
const IDX_ICAO24: usize = 0;
const IDX_CALLSIGN: usize = 1;
const IDX_LAST_CONTACT: usize = 4;
const IDX_TIME_POSITION: usize = 5;
const IDX_LAT: usize = 6;
const IDX_LON: usize = 7;
const IDX_ALTITUDE: usize = 8;
const IDX_ON_GROUND: usize = 9;
const IDX_VELOCITY: usize = 10;
const IDX_HEADING: usize = 11;
const IDX_VERTICAL_RATE: usize = 16;
const STATE_VECTOR_LEN: usize = 17;

/// One poll's worth of raw records, stamped with the feed's batch time.
#[derive(Debug, Clone)]
pub struct RawBatch {
    pub time: DateTime<Utc>,
    pub records: Vec<RawStateRecord>,
    /// State vectors dropped for being structurally unusable.
    pub skipped: usize,
}

/// Parse a feed response body into a batch.
pub fn parse_states(body: &Value) -> Result<RawBatch, FeedError> {
    let time = body
        .get("time")
        .and_then(Value::as_i64)
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .ok_or_else(|| FeedError::Decode("missing or invalid batch time".into()))?;

    // An empty window comes back as "states": null, not an empty array.
    let states = match body.get("states") {
        None | Some(Value::Null) => &[][..],
        Some(Value::Array(states)) => states.as_slice(),
        Some(_) => return Err(FeedError::Decode("states is not an array".into())),
    };

    let mut records = Vec::with_capacity(states.len());
    let mut skipped = 0;
    for state in states {
        match state.as_array().filter(|sv| sv.len() >= STATE_VECTOR_LEN) {
            Some(sv) => records.push(parse_state_vector(sv, time)),
            None => skipped += 1,
        }
    }

    Ok(RawBatch {
        time,
        records,
        skipped,
    })
}

fn parse_state_vector(sv: &[Value], batch_time: DateTime<Utc>) -> RawStateRecord {
    // Prefer the position timestamp, fall back to last contact, then to the
    // batch time, so the monotonic merge always has something to compare.
    let timestamp = field_i64(sv, IDX_TIME_POSITION)
        .or_else(|| field_i64(sv, IDX_LAST_CONTACT))
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .or(Some(batch_time));

    RawStateRecord {
        id: field_str(sv, IDX_ICAO24),
        callsign: field_str(sv, IDX_CALLSIGN),
        lat: field_f64(sv, IDX_LAT),
        lon: field_f64(sv, IDX_LON),
        altitude_m: field_f64(sv, IDX_ALTITUDE),
        speed_mps: field_f64(sv, IDX_VELOCITY),
        heading_deg: field_f64(sv, IDX_HEADING),
        vertical_rate_mps: field_f64(sv, IDX_VERTICAL_RATE),
        on_ground: sv.get(IDX_ON_GROUND).and_then(Value::as_bool),
        timestamp,
    }
}

/// Strings come space-padded from the transponder; an all-blank callsign is
/// no callsign.
fn field_str(sv: &[Value], idx: usize) -> Option<String> {
    sv.get(idx)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn field_f64(sv: &[Value], idx: usize) -> Option<f64> {
    sv.get(idx).and_then(Value::as_f64)
}

fn field_i64(sv: &[Value], idx: usize) -> Option<i64> {
    sv.get(idx).and_then(Value::as_i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_body() -> Value {
        json!({
            "time": 1_700_000_000,
            "states": [
                // Complete record
                ["abc123", "N12345  ", "United States", null, 1_699_999_998, 1_699_999_999,
                 37.3329, -121.8195, 450.0, false, 62.0, 130.0, null, null, null, null, -2.5],
                // Nulls everywhere except the id
                ["def456", null, null, null, null,
                 null, null, null, null, null, null, null, null, null, null, null, null],
                // Too short: dropped at the array level
                ["ghi789", "SHORT"]
            ]
        })
    }

    #[test]
    fn parses_fields_and_preserves_unknowns() {
        let batch = parse_states(&sample_body()).unwrap();
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.skipped, 1);

        let full = &batch.records[0];
        assert_eq!(full.id.as_deref(), Some("abc123"));
        assert_eq!(full.callsign.as_deref(), Some("N12345"));
        assert_eq!(full.lat, Some(37.3329));
        assert_eq!(full.vertical_rate_mps, Some(-2.5));
        assert_eq!(full.on_ground, Some(false));
        // Position timestamp (index 5) wins over last contact.
        assert_eq!(full.timestamp.unwrap().timestamp(), 1_699_999_999);

        let sparse = &batch.records[1];
        assert_eq!(sparse.id.as_deref(), Some("def456"));
        assert!(sparse.lat.is_none());
        assert!(sparse.altitude_m.is_none());
        assert!(sparse.on_ground.is_none());
        // No per-record time: stamped with the batch time.
        assert_eq!(sparse.timestamp.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn null_states_is_an_empty_batch() {
        let batch = parse_states(&json!({"time": 1_700_000_000, "states": null})).unwrap();
        assert!(batch.records.is_empty());
        assert_eq!(batch.skipped, 0);
    }

    #[test]
    fn missing_time_is_a_decode_error() {
        let err = parse_states(&json!({"states": []})).unwrap_err();
        assert!(matches!(err, FeedError::Decode(_)));
    }

    #[test]
    fn blank_callsign_is_unknown() {
        let body = json!({
            "time": 1_700_000_000,
            "states": [["abc123", "        ", null, null, null,
                null, null, null, null, null, null, null, null, null, null, null, null]]
        });
        let batch = parse_states(&body).unwrap();
        assert!(batch.records[0].callsign.is_none());
    }
}
