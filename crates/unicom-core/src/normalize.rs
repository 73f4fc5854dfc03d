//! Raw feed records and the merge policy for the track table.
//!
//! The feed hands us optional-everywhere state records. This module decides,
//! per record, whether the track table should insert, overwrite, or discard —
//! the caller owns the table itself and applies the decision under its own
//! concurrency discipline (keyed upserts, per-id atomicity).

use crate::models::{AircraftTrack, Position};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw state record as received from the telemetry feed. Any field may be
/// missing, including `id`; records without an id are unusable and counted as
/// malformed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawStateRecord {
    pub id: Option<String>,
    pub callsign: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub altitude_m: Option<f64>,
    pub speed_mps: Option<f64>,
    pub heading_deg: Option<f64>,
    pub vertical_rate_mps: Option<f64>,
    pub on_ground: Option<bool>,
    /// Per-record sample time; the batch timestamp is used when absent.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Outcome of applying one record against the stored track (if any).
#[derive(Debug, Clone)]
pub enum UpsertDecision {
    /// Store this track (insert or overwrite).
    Apply(AircraftTrack),
    /// Sample is temporally older than the stored track; table unchanged.
    StaleDiscard,
    /// Record has no id; table unchanged.
    Malformed,
}

/// Per-batch counters. None of these are errors; the batch always completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub upserted: u64,
    pub stale_discarded: u64,
    pub malformed: u64,
}

impl BatchStats {
    pub fn absorb(&mut self, other: BatchStats) {
        self.upserted += other.upserted;
        self.stale_discarded += other.stale_discarded;
        self.malformed += other.malformed;
    }
}

/// Decide what a record does to the track table.
///
/// The monotonic rule gates the whole sample: it applies iff its timestamp is
/// `>=` the stored track's (last *temporally* valid write wins, equal
/// timestamps are valid refreshes). Within an applied sample the merge is
/// field-level: a present field overwrites, an absent field preserves the
/// stored value, so the track stays the latest *known* state rather than the
/// latest message.
pub fn apply_record(
    existing: Option<&AircraftTrack>,
    record: &RawStateRecord,
    batch_time: DateTime<Utc>,
) -> UpsertDecision {
    let Some(id) = record.id.as_deref() else {
        return UpsertDecision::Malformed;
    };

    let sample_time = record.timestamp.unwrap_or(batch_time);

    match existing {
        None => UpsertDecision::Apply(fresh_track(id, record, sample_time)),
        Some(stored) => {
            if sample_time < stored.timestamp {
                return UpsertDecision::StaleDiscard;
            }
            UpsertDecision::Apply(merged_track(stored, record, sample_time))
        }
    }
}

fn record_position(record: &RawStateRecord) -> Option<Position> {
    // A position needs both coordinates; a lone lat or lon is not one.
    match (record.lat, record.lon) {
        (Some(lat), Some(lon)) => Some(Position { lat, lon }),
        _ => None,
    }
}

fn fresh_track(id: &str, record: &RawStateRecord, timestamp: DateTime<Utc>) -> AircraftTrack {
    AircraftTrack {
        id: id.to_string(),
        callsign: record.callsign.clone(),
        position: record_position(record),
        altitude_m: record.altitude_m,
        heading_deg: record.heading_deg,
        speed_mps: record.speed_mps,
        vertical_rate_mps: record.vertical_rate_mps,
        on_ground: record.on_ground,
        timestamp,
    }
}

fn merged_track(
    stored: &AircraftTrack,
    record: &RawStateRecord,
    timestamp: DateTime<Utc>,
) -> AircraftTrack {
    AircraftTrack {
        id: stored.id.clone(),
        callsign: record.callsign.clone().or_else(|| stored.callsign.clone()),
        position: record_position(record).or(stored.position),
        altitude_m: record.altitude_m.or(stored.altitude_m),
        heading_deg: record.heading_deg.or(stored.heading_deg),
        speed_mps: record.speed_mps.or(stored.speed_mps),
        vertical_rate_mps: record.vertical_rate_mps.or(stored.vertical_rate_mps),
        on_ground: record.on_ground.or(stored.on_ground),
        timestamp,
    }
}
