//! Geofence router: partition tracks into per-airport vicinity sets.

use crate::models::{AircraftTrack, AirportContext};
use crate::spatial::haversine_distance;
use std::collections::HashMap;

/// True iff the track has a position within the airport's vicinity radius.
/// Tracks without a position are unroutable and belong to no vicinity.
pub fn in_vicinity(track: &AircraftTrack, airport: &AirportContext) -> bool {
    let Some(pos) = track.position else {
        return false;
    };
    let dist = haversine_distance(
        pos.lat,
        pos.lon,
        airport.position.lat,
        airport.position.lon,
    );
    dist <= airport.radius_m
}

/// Partition tracks by airport vicinity.
///
/// Every airport gets an entry, empty or not, and each set is sorted by track
/// id so downstream pair iteration and tie-breaking are deterministic. A track
/// inside two overlapping vicinities appears in both sets; on-ground tracks
/// are included (runway occupancy needs them) and the analyzer excludes them
/// from airborne-only checks itself.
pub fn vicinity_sets(
    tracks: &[AircraftTrack],
    airports: &[AirportContext],
) -> HashMap<String, Vec<AircraftTrack>> {
    let mut sets: HashMap<String, Vec<AircraftTrack>> = HashMap::with_capacity(airports.len());
    for airport in airports {
        let mut members: Vec<AircraftTrack> = tracks
            .iter()
            .filter(|track| in_vicinity(track, airport))
            .cloned()
            .collect();
        members.sort_by(|a, b| a.id.cmp(&b.id));
        sets.insert(airport.icao.clone(), members);
    }
    sets
}
