//! HTTP client for the upstream state-vector feed (OpenSky-style API).

use crate::parse::{parse_states, RawBatch};
use std::time::Duration;
use thiserror::Error;
use unicom_core::Position;

/// Errors from one poll. All of them are non-fatal to the engine: the prior
/// tick's tracks persist and age toward staleness.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Transport-level failure, including request timeouts.
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-success HTTP status (rate limiting, auth rejection, outage).
    #[error("feed returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("feed response malformed: {0}")]
    Decode(String),
}

/// Geographic query window for one poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Square window covering a circle of `radius_m` around `center`, with
    /// the longitude span widened by the local latitude compression.
    pub fn around(center: Position, radius_m: f64) -> Self {
        let lat_span = radius_m / unicom_core::spatial::meters_per_deg_lat(center.lat);
        let lon_span = radius_m / unicom_core::spatial::meters_per_deg_lon(center.lat).max(1e-9);
        Self {
            min_lat: center.lat - lat_span,
            max_lat: center.lat + lat_span,
            min_lon: center.lon - lon_span,
            max_lon: center.lon + lon_span,
        }
    }
}

/// Polling client. One instance is shared across ticks; the request timeout
/// lives here so a stalled upstream can never stall the tick loop.
pub struct FeedClient {
    client: reqwest::Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl FeedClient {
    pub fn new(
        base_url: impl Into<String>,
        username: Option<String>,
        password: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            username,
            password,
        })
    }

    /// Fetch the current state vectors inside `bbox`.
    pub async fn poll(&self, bbox: &BoundingBox) -> Result<RawBatch, FeedError> {
        let url = format!(
            "{}/states/all?lamin={}&lomin={}&lamax={}&lomax={}",
            self.base_url, bbox.min_lat, bbox.min_lon, bbox.max_lat, bbox.max_lon
        );

        let mut request = self.client.get(&url);
        if let (Some(user), Some(pass)) = (self.username.as_deref(), self.password.as_deref()) {
            request = request.basic_auth(user, Some(pass));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status));
        }

        let body: serde_json::Value = response.json().await?;
        let batch = parse_states(&body)?;
        if batch.skipped > 0 {
            tracing::debug!(
                skipped = batch.skipped,
                "dropped malformed state vectors from feed response"
            );
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_is_centered_and_widens_with_latitude() {
        let low = BoundingBox::around(Position::new(0.0, 10.0), 18_520.0);
        let high = BoundingBox::around(Position::new(60.0, 10.0), 18_520.0);

        assert!((low.max_lat + low.min_lat - 0.0).abs() < 1e-9);
        let low_lon_span = low.max_lon - low.min_lon;
        let high_lon_span = high.max_lon - high.min_lon;
        // At 60N a degree of longitude is about half as wide, so the window
        // must span roughly twice as many degrees.
        assert!(high_lon_span > 1.8 * low_lon_span);
    }
}
