//! Feed client for the airport safety monitor.
//!
//! Wraps the upstream ADS-B state-vector API behind the narrow interface the
//! engine consumes: `poll(bounding box) -> batch of optionally-incomplete raw
//! records`. Delivery failures are values, not panics; the engine treats every
//! one of them as "no fresh data this tick".

mod client;
mod parse;

pub use client::{BoundingBox, FeedClient, FeedError};
pub use parse::{parse_states, RawBatch};
