//! Engine thresholds and advisory lifetimes.

use crate::models::Category;
use chrono::Duration;
use serde::{Deserialize, Serialize};

pub const METERS_PER_NM: f64 = 1852.0;

/// Tunable thresholds for the whole engine. One instance is shared by the
/// normalizer, analyzer, and advisory manager; all distances are meters and
/// all ages are seconds so the struct stays trivially serializable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineRules {
    /// Approach corridor length from the threshold, along the reciprocal of
    /// the runway heading.
    pub corridor_length_m: f64,
    /// Lateral tolerance for "on corridor" (point-to-segment distance).
    pub corridor_width_m: f64,
    /// Ceiling below which pattern separation checks apply.
    pub pattern_ceiling_m: f64,
    /// Minimum horizontal separation in the pattern.
    pub pattern_min_horizontal_m: f64,
    /// Minimum vertical separation in the pattern.
    pub pattern_min_vertical_m: f64,
    /// Radius around a runway threshold counted as runway vicinity.
    pub runway_proximity_m: f64,
    /// Age after which a track stops feeding new findings.
    pub max_staleness_secs: i64,
    /// Age after which a track is dropped from the table entirely.
    pub eviction_window_secs: i64,
    /// Consecutive failed polls before a Stale advisory is raised.
    pub stale_after_failures: u32,
    /// Minimum movement before a track change event is re-published.
    pub publish_move_threshold_m: f64,
    pub ttl_approach_secs: i64,
    pub ttl_pattern_secs: i64,
    pub ttl_runway_secs: i64,
    pub ttl_stale_secs: i64,
}

impl Default for EngineRules {
    fn default() -> Self {
        Self {
            corridor_length_m: 5.0 * METERS_PER_NM,
            corridor_width_m: METERS_PER_NM,
            pattern_ceiling_m: 460.0, // ~1500 ft AGL pattern altitude
            pattern_min_horizontal_m: 600.0,
            pattern_min_vertical_m: 150.0,
            runway_proximity_m: 500.0,
            max_staleness_secs: 60,
            eviction_window_secs: 300,
            stale_after_failures: 4,
            publish_move_threshold_m: 25.0,
            ttl_approach_secs: 15 * 60,
            ttl_pattern_secs: 10 * 60,
            ttl_runway_secs: 10 * 60,
            ttl_stale_secs: 60 * 60,
        }
    }
}

impl EngineRules {
    pub fn ttl(&self, category: Category) -> Duration {
        let secs = match category {
            Category::Approach => self.ttl_approach_secs,
            Category::Pattern => self.ttl_pattern_secs,
            Category::Runway => self.ttl_runway_secs,
            Category::Stale => self.ttl_stale_secs,
        };
        Duration::seconds(secs)
    }

    pub fn max_staleness(&self) -> Duration {
        Duration::seconds(self.max_staleness_secs)
    }

    pub fn eviction_window(&self) -> Duration {
        Duration::seconds(self.eviction_window_secs)
    }
}
