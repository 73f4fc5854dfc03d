//! Per-airport, per-tick conflict analysis.
//!
//! `analyze` is a pure function of its inputs: no internal state, no clock
//! reads, no randomness. Identical inputs produce an identical finding list,
//! content and order, which the advisory manager and the tests rely on.

use crate::models::{AircraftTrack, AirportContext, Category, Finding, Runway, Severity, TrackHealth};
use crate::rules::EngineRules;
use crate::spatial::{distance_to_segment_m, haversine_distance, offset_by_bearing};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Analyze one airport's vicinity set.
///
/// `vicinity` is expected sorted by track id (the router guarantees it); the
/// analyzer re-sorts defensively since determinism depends on it. Stale tracks
/// are excluded from finding generation here, not by the router, so query
/// surfaces can still show them.
pub fn analyze(
    vicinity: &[AircraftTrack],
    airport: &AirportContext,
    now: DateTime<Utc>,
    rules: &EngineRules,
) -> Vec<Finding> {
    let mut fresh: Vec<&AircraftTrack> = vicinity
        .iter()
        .filter(|t| t.health(now, rules.max_staleness()) == TrackHealth::Fresh)
        .collect();
    fresh.sort_by(|a, b| a.id.cmp(&b.id));

    let mut findings = Vec::new();
    // Degenerate geometry: no runways means no corridors and no thresholds,
    // but pattern separation still applies.
    if !airport.runways.is_empty() {
        approach_findings(&fresh, airport, rules, &mut findings);
    }
    pattern_findings(&fresh, airport, rules, &mut findings);
    if !airport.runways.is_empty() {
        runway_findings(&fresh, airport, rules, &mut findings);
    }
    findings
}

/// Severity step for corridor occupancy and runway crowding. Monotone in the
/// count; saturates at critical.
fn step_severity(count: usize) -> Severity {
    match count {
        0 | 1 => Severity::Caution,
        2 => Severity::Warning,
        _ => Severity::Critical,
    }
}

/// Approach corridor occupancy, one finding per occupied active runway.
///
/// The corridor is the segment from the runway threshold to a point
/// `corridor_length_m` out along the reciprocal of the runway heading, i.e.
/// extending away from the field under the final approach path. Occupancy is
/// a true point-to-segment distance test against descending airborne traffic.
fn approach_findings(
    fresh: &[&AircraftTrack],
    airport: &AirportContext,
    rules: &EngineRules,
    findings: &mut Vec<Finding>,
) {
    for runway in airport.runways.iter().filter(|r| r.active) {
        let Some((far_lat, far_lon)) = corridor_far_end(runway, rules.corridor_length_m) else {
            continue;
        };

        let mut on_corridor = BTreeSet::new();
        for track in fresh {
            if !track.is_airborne() {
                continue;
            }
            // Missing vertical rate means not known to be descending.
            if !matches!(track.vertical_rate_mps, Some(rate) if rate < 0.0) {
                continue;
            }
            let Some(pos) = track.position else { continue };
            let dist = distance_to_segment_m(
                pos.lat,
                pos.lon,
                runway.threshold.lat,
                runway.threshold.lon,
                far_lat,
                far_lon,
            );
            if dist <= rules.corridor_width_m {
                on_corridor.insert(track.id.clone());
            }
        }

        if on_corridor.is_empty() {
            continue;
        }
        let count = on_corridor.len();
        findings.push(Finding {
            airport: airport.icao.clone(),
            category: Category::Approach,
            severity: step_severity(count),
            message: format!(
                "{count} aircraft on approach to runway {} at {}",
                runway.ident, airport.icao
            ),
            tracks: on_corridor,
        });
    }
}

/// Far end of the approach corridor, or None for degenerate runway geometry.
fn corridor_far_end(runway: &Runway, length_m: f64) -> Option<(f64, f64)> {
    if !runway.heading_deg.is_finite() || length_m <= 0.0 {
        return None;
    }
    let reciprocal_rad = (runway.heading_deg + 180.0).rem_euclid(360.0).to_radians();
    Some(offset_by_bearing(
        runway.threshold.lat,
        runway.threshold.lon,
        length_m,
        reciprocal_rad,
    ))
}

/// Pattern separation between airborne pairs below the pattern ceiling.
///
/// Pairs are walked in ascending-id order and each unordered pair is evaluated
/// exactly once. A pair with unknown altitude on either side is skipped;
/// unknown is not zero.
fn pattern_findings(
    fresh: &[&AircraftTrack],
    airport: &AirportContext,
    rules: &EngineRules,
    findings: &mut Vec<Finding>,
) {
    let candidates: Vec<&&AircraftTrack> = fresh
        .iter()
        .filter(|t| {
            t.is_airborne()
                && t.position.is_some()
                && matches!(t.altitude_m, Some(alt) if alt < rules.pattern_ceiling_m)
        })
        .collect();

    for i in 0..candidates.len() {
        for j in (i + 1)..candidates.len() {
            let (a, b) = (candidates[i], candidates[j]);
            let (pa, pb) = (a.position.unwrap(), b.position.unwrap());
            let horizontal = haversine_distance(pa.lat, pa.lon, pb.lat, pb.lon);
            let vertical = (a.altitude_m.unwrap() - b.altitude_m.unwrap()).abs();
            if horizontal >= rules.pattern_min_horizontal_m
                || vertical >= rules.pattern_min_vertical_m
            {
                continue;
            }

            let mut tracks = BTreeSet::new();
            tracks.insert(a.id.clone());
            tracks.insert(b.id.clone());
            findings.push(Finding {
                airport: airport.icao.clone(),
                category: Category::Pattern,
                severity: Severity::Warning,
                message: format!(
                    "Insufficient pattern separation between {} and {} at {}",
                    a.display_name(),
                    b.display_name(),
                    airport.icao
                ),
                tracks,
            });
        }
    }
}

/// Runway-vicinity crowding: tracks (airborne or on-ground) within the
/// proximity radius of any runway threshold. A single aircraft near a
/// threshold is normal operations; two or more is a finding.
fn runway_findings(
    fresh: &[&AircraftTrack],
    airport: &AirportContext,
    rules: &EngineRules,
    findings: &mut Vec<Finding>,
) {
    let mut near = BTreeSet::new();
    for track in fresh {
        let Some(pos) = track.position else { continue };
        let close = airport.runways.iter().any(|runway| {
            [runway.threshold, runway.reciprocal_threshold]
                .iter()
                .any(|thr| {
                    haversine_distance(pos.lat, pos.lon, thr.lat, thr.lon)
                        <= rules.runway_proximity_m
                })
        });
        if close {
            near.insert(track.id.clone());
        }
    }

    if near.len() <= 1 {
        return;
    }
    let count = near.len();
    findings.push(Finding {
        airport: airport.icao.clone(),
        category: Category::Runway,
        // Keyed one below the corridor step: two aircraft sharing a runway
        // environment is caution, three warning, four or more critical.
        severity: step_severity(count - 1),
        message: format!("{count} aircraft near runway thresholds at {}", airport.icao),
        tracks: near,
    });
}
