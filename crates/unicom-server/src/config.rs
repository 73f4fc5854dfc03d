//! Server configuration from environment.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub feed_url: String,
    pub feed_username: Option<String>,
    pub feed_password: Option<String>,
    /// Per-request feed timeout; a stalled upstream must never stall ticks.
    pub feed_timeout_secs: u64,
    /// Matches the upstream refresh cadence.
    pub tick_interval_secs: u64,
    pub airports_path: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_port: env::var("UNICOM_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3000),
            feed_url: env::var("UNICOM_FEED_URL")
                .unwrap_or_else(|_| "https://opensky-network.org/api".to_string()),
            feed_username: env::var("UNICOM_FEED_USERNAME").ok(),
            feed_password: env::var("UNICOM_FEED_PASSWORD").ok(),
            feed_timeout_secs: env::var("UNICOM_FEED_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            tick_interval_secs: env::var("UNICOM_TICK_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(15),
            airports_path: env::var("UNICOM_AIRPORTS")
                .unwrap_or_else(|_| "airports.json".to_string()),
        }
    }
}
