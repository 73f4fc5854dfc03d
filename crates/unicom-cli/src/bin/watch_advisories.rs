//! Poll a running monitor and print the ranked advisory board.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::thread::sleep;
use std::time::Duration;
use unicom_core::Advisory;

#[derive(Parser)]
#[command(about = "Watch active advisories from a UNICOM server")]
struct Args {
    /// Server base URL
    #[arg(long, default_value = "http://localhost:3000")]
    server: String,

    /// Only show advisories for this airport (ICAO)
    #[arg(long)]
    airport: Option<String>,

    /// Seconds between refreshes
    #[arg(long, default_value_t = 5)]
    interval_secs: u64,

    /// Fetch once and exit
    #[arg(long)]
    once: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let client = reqwest::blocking::Client::new();

    let mut url = format!("{}/v1/advisories", args.server);
    if let Some(airport) = &args.airport {
        url = format!("{url}?airport={airport}");
    }

    loop {
        let advisories: Vec<Advisory> = client
            .get(&url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .with_context(|| format!("fetching {url}"))?
            .json()
            .context("decoding advisory list")?;

        print_board(&advisories);

        if args.once {
            return Ok(());
        }
        sleep(Duration::from_secs(args.interval_secs));
    }
}

fn print_board(advisories: &[Advisory]) {
    println!("--- {} active advisories ({}) ---", advisories.len(), Utc::now().format("%H:%M:%SZ"));
    for advisory in advisories {
        let remaining = (advisory.expires_at - Utc::now()).num_seconds().max(0);
        println!(
            "[{}] {:8} {:22} expires in {:>4}s  {}",
            advisory.severity.level(),
            advisory.category.to_string(),
            advisory.id,
            remaining,
            advisory.message
        );
    }
}
