//! Conflict detection and advisory lifecycle engine for non-towered airport
//! safety monitoring.
//!
//! The crate is pure: no I/O, no async, no clock reads. Time enters every API
//! as an explicit `DateTime<Utc>`, which is what makes ticks deterministic and
//! testable without wall-clock waits.

pub mod advisory;
pub mod analyzer;
pub mod models;
pub mod normalize;
pub mod rules;
pub mod spatial;
pub mod vicinity;

pub use advisory::{sort_ranked, AdvisoryBook, IngestOutcome};
pub use analyzer::analyze;
pub use models::{
    Advisory, AdvisoryState, AircraftTrack, AirportContext, Category, EngineEvent, Finding,
    Position, Runway, Severity, TrackHealth,
};
pub use normalize::{apply_record, BatchStats, RawStateRecord, UpsertDecision};
pub use rules::{EngineRules, METERS_PER_NM};
pub use vicinity::{in_vicinity, vicinity_sets};
