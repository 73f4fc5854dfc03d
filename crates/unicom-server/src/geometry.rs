//! Static airport geometry, loaded once at startup.
//!
//! The geometry store is a read-mostly collaborator: a JSON file of
//! `AirportContext` entries. An unreadable or empty file aborts startup;
//! nothing here can fail a running tick.

use std::fs;
use std::path::Path;
use thiserror::Error;
use unicom_core::AirportContext;

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("reading airport geometry: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing airport geometry: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("airport geometry file defines no airports")]
    Empty,
}

/// Load and sanity-check the airport list.
///
/// Degenerate entries (no runways) are kept — pattern checks still apply to
/// them — but logged, since corridor and runway-vicinity checks will be
/// skipped.
pub fn load_airports(path: impl AsRef<Path>) -> Result<Vec<AirportContext>, GeometryError> {
    let raw = fs::read_to_string(path)?;
    let airports: Vec<AirportContext> = serde_json::from_str(&raw)?;
    if airports.is_empty() {
        return Err(GeometryError::Empty);
    }

    for airport in &airports {
        if airport.runways.is_empty() {
            tracing::warn!(
                airport = %airport.icao,
                "airport has no runway geometry; corridor and runway checks disabled"
            );
        } else if !airport.runways.iter().any(|r| r.active) {
            tracing::info!(airport = %airport.icao, "no active runway configured");
        }
    }
    Ok(airports)
}
