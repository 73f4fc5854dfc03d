//! Validate an airport geometry file offline, before handing it to the
//! server.

use anyhow::{bail, Context, Result};
use clap::Parser;
use unicom_core::AirportContext;

#[derive(Parser)]
#[command(about = "Validate a UNICOM airport geometry file")]
struct Args {
    /// Path to the geometry JSON file
    path: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let raw = std::fs::read_to_string(&args.path)
        .with_context(|| format!("reading {}", args.path))?;
    let airports: Vec<AirportContext> =
        serde_json::from_str(&raw).context("parsing airport geometry")?;

    if airports.is_empty() {
        bail!("geometry file defines no airports");
    }

    let mut warnings = 0;
    for airport in &airports {
        println!(
            "{}: {} ({} runways, radius {:.1} km)",
            airport.icao,
            airport.name,
            airport.runways.len(),
            airport.radius_m / 1000.0
        );

        if airport.radius_m <= 0.0 {
            println!("  warning: non-positive vicinity radius");
            warnings += 1;
        }
        if airport.runways.is_empty() {
            println!("  warning: no runways; corridor and runway checks will be skipped");
            warnings += 1;
        }
        for runway in &airport.runways {
            if !runway.heading_deg.is_finite() {
                println!("  warning: runway {} has a non-finite heading", runway.ident);
                warnings += 1;
            }
            if !runway.active {
                println!("  note: runway {} is inactive (no approach corridor)", runway.ident);
            }
        }
    }

    println!(
        "{} airports checked, {} warnings",
        airports.len(),
        warnings
    );
    Ok(())
}
