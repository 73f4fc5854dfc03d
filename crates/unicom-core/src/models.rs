//! Core data models for the airport safety monitor.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A WGS84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Canonical, deduplicated latest known state of one aircraft.
///
/// Every telemetry field is optional. The upstream feed routinely omits
/// fields, and "unknown" must stay distinguishable from a legitimate zero
/// reading: an aircraft reporting 0 m/s vertical rate is level, an aircraft
/// reporting nothing is not known to be level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AircraftTrack {
    /// Feed-assigned identifier (ICAO 24-bit address), unique per aircraft.
    pub id: String,
    #[serde(default)]
    pub callsign: Option<String>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub altitude_m: Option<f64>,
    #[serde(default)]
    pub heading_deg: Option<f64>,
    #[serde(default)]
    pub speed_mps: Option<f64>,
    #[serde(default)]
    pub vertical_rate_mps: Option<f64>,
    #[serde(default)]
    pub on_ground: Option<bool>,
    /// Timestamp of the newest sample merged into this track.
    pub timestamp: DateTime<Utc>,
}

impl AircraftTrack {
    /// Unknown ground state is treated as airborne so conflict checks stay
    /// conservative.
    pub fn is_airborne(&self) -> bool {
        self.on_ground != Some(true)
    }

    /// Display name for advisory messages: callsign when known, id otherwise.
    pub fn display_name(&self) -> &str {
        self.callsign.as_deref().unwrap_or(&self.id)
    }

    pub fn health(&self, now: DateTime<Utc>, max_staleness: Duration) -> TrackHealth {
        if now - self.timestamp > max_staleness {
            TrackHealth::Stale
        } else {
            TrackHealth::Fresh
        }
    }
}

/// Computed from the track timestamp each tick, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackHealth {
    Fresh,
    /// No sample within the staleness window; excluded from new findings but
    /// still visible in query results until evicted.
    Stale,
}

/// One landing direction of a runway surface.
///
/// A runway usable in both directions appears as two entries ("13" and "31"),
/// each with its own threshold and heading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Runway {
    pub ident: String,
    /// Magnetic-ish heading of the landing direction in degrees.
    pub heading_deg: f64,
    pub length_m: f64,
    pub width_m: f64,
    /// Touchdown threshold for this direction.
    pub threshold: Position,
    /// Threshold of the opposite direction (far end of the surface).
    pub reciprocal_threshold: Position,
    /// Advisory-relevant metadata; several runways may be active at once.
    pub active: bool,
}

/// Static geometry for one monitored airport. Read-only to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirportContext {
    pub icao: String,
    pub name: String,
    /// Airport reference point.
    pub position: Position,
    /// Vicinity radius around the reference point in meters.
    pub radius_m: f64,
    pub runways: Vec<Runway>,
}

/// Advisory category. `Stale` is the feed-outage status advisory; it is
/// synthesized by the engine loop, never by the conflict analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Approach,
    Pattern,
    Runway,
    Stale,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Approach => "APPROACH",
            Category::Pattern => "PATTERN",
            Category::Runway => "RUNWAY",
            Category::Stale => "STALE",
        };
        f.write_str(name)
    }
}

/// Severity ladder. Variants are declared in ascending order so the derived
/// `Ord` ranks `Critical` highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Information,
    Caution,
    Warning,
    Urgent,
    Critical,
}

impl Severity {
    /// Numeric rank, 1 (information) through 5 (critical).
    pub fn level(self) -> u8 {
        match self {
            Severity::Information => 1,
            Severity::Caution => 2,
            Severity::Warning => 3,
            Severity::Urgent => 4,
            Severity::Critical => 5,
        }
    }
}

/// Ephemeral candidate conflict, produced by the analyzer each tick and
/// consumed immediately by the advisory manager. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub airport: String,
    pub category: Category,
    pub severity: Severity,
    /// Involved track ids; order-irrelevant set.
    pub tracks: BTreeSet<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvisoryState {
    Open,
    /// Terminal. An expired advisory is never reopened; a recurring finding
    /// creates a fresh advisory with a new id.
    Expired,
}

/// A durable, time-bounded safety notice derived from one or more findings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Advisory {
    pub id: String,
    pub airport: String,
    pub category: Category,
    pub severity: Severity,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub tracks: BTreeSet<String>,
    pub state: AdvisoryState,
}

impl Advisory {
    /// Matching rule for dedup: same airport and category, overlapping track
    /// sets. Two empty sets overlap, so category-level advisories (Stale)
    /// dedupe to one per airport.
    pub fn matches(&self, finding: &Finding) -> bool {
        self.airport == finding.airport
            && self.category == finding.category
            && sets_overlap(&self.tracks, &finding.tracks)
    }
}

fn sets_overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> bool {
    if a.is_empty() && b.is_empty() {
        return true;
    }
    a.intersection(b).next().is_some()
}

/// Change-event stream payload handed to the publisher boundary.
///
/// Delivery is best-effort; the transport may drop, reorder, or duplicate.
/// Consumers dedupe on (id, expires_at) for advisories and (id, timestamp)
/// for tracks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum EngineEvent {
    Advisory(Advisory),
    Track(AircraftTrack),
}
