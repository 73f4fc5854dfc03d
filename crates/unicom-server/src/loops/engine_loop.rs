//! The fixed-interval engine tick.
//!
//! Each tick: poll the feed per airport, normalize into the track table,
//! sweep stale tracks and expired advisories, analyze every airport against
//! its vicinity snapshot, ingest findings, and only then publish change
//! events. Airports are analyzed concurrently: each task reads an immutable
//! snapshot and mutates only its own airport's advisory partition.
//!
//! The processing pass is a plain function over injected batches and an
//! injected `now`, so integration tests drive ticks without timers or
//! network.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::state::AppState;
use unicom_core::normalize::BatchStats;
use unicom_core::{analyze, vicinity_sets, Advisory, Category, Finding, Severity};
use unicom_feed::{BoundingBox, FeedClient, RawBatch};

/// One airport's poll result for a tick. `None` means the poll failed; prior
/// tracks persist and age toward staleness.
pub struct AirportPoll {
    pub icao: String,
    pub batch: Option<RawBatch>,
}

/// What one processing pass did, for logging and tests.
#[derive(Debug, Default)]
pub struct TickReport {
    pub stats: BatchStats,
    pub failed_polls: usize,
    pub evicted_tracks: usize,
    pub expired: Vec<Advisory>,
    pub created: Vec<Advisory>,
    pub updated: Vec<Advisory>,
    pub published_tracks: usize,
}

/// Run the tick loop until the shutdown signal flips. The signal is only
/// checked between ticks, so an in-flight tick always completes and advisory
/// state is never left half-mutated.
pub async fn run_engine_loop(
    state: Arc<AppState>,
    feed: FeedClient,
    tick_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => {
                tracing::info!("engine loop stopping");
                return;
            }
        }

        let polls = fetch_polls(&state, &feed).await;
        let now = Utc::now();
        let report = run_processing_pass(state.clone(), polls, now).await;

        tracing::info!(
            tick = state.tick_count(),
            upserted = report.stats.upserted,
            stale_discarded = report.stats.stale_discarded,
            malformed = report.stats.malformed,
            failed_polls = report.failed_polls,
            evicted = report.evicted_tracks,
            advisories_created = report.created.len(),
            advisories_updated = report.updated.len(),
            advisories_expired = report.expired.len(),
            "tick complete"
        );
    }
}

/// Poll the feed once per airport bounding box.
async fn fetch_polls(state: &AppState, feed: &FeedClient) -> Vec<AirportPoll> {
    let mut polls = Vec::with_capacity(state.airports().len());
    for airport in state.airports() {
        let bbox = BoundingBox::around(airport.position, airport.radius_m);
        let batch = match feed.poll(&bbox).await {
            Ok(batch) => Some(batch),
            Err(err) => {
                tracing::warn!(airport = %airport.icao, error = %err, "feed poll failed");
                None
            }
        };
        polls.push(AirportPoll {
            icao: airport.icao.clone(),
            batch,
        });
    }
    polls
}

/// Normalize, sweep, analyze, ingest, publish — one tick's worth of work
/// against an explicit `now`.
pub async fn run_processing_pass(
    state: Arc<AppState>,
    polls: Vec<AirportPoll>,
    now: DateTime<Utc>,
) -> TickReport {
    let mut report = TickReport::default();

    // 1. Normalize every successful batch into the shared track table.
    for poll in &polls {
        match &poll.batch {
            Some(batch) => {
                let stats = state.apply_records(&batch.records, batch.time);
                report.stats.absorb(stats);
                report.stats.malformed += batch.skipped as u64;
                state.feed_result(&poll.icao, true);
            }
            None => {
                report.failed_polls += 1;
                let streak = state.feed_result(&poll.icao, false);
                tracing::warn!(
                    airport = %poll.icao,
                    streak,
                    "no fresh data; tracks aging toward staleness"
                );
            }
        }
    }
    state.record_batch_stats(report.stats);

    // 2. Sweep tracks past the eviction window.
    report.evicted_tracks = state.evict_stale(now);

    // 3. Snapshot and route. The snapshot is immutable for the rest of the
    // tick, which is what makes per-airport analysis safe to parallelize.
    let tracks = state.tracks_snapshot();
    let mut sets = vicinity_sets(&tracks, state.airports());

    // 4. Analyze and ingest per airport, concurrently. Finding generation for
    // an airport fully completes before its partition is mutated.
    let mut handles = Vec::with_capacity(state.airports().len());
    for airport in state.airports().iter().cloned() {
        let vicinity = sets.remove(&airport.icao).unwrap_or_default();
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            let mut findings = analyze(&vicinity, &airport, now, state.rules());
            let streak = state.failure_streak(&airport.icao);
            if streak >= state.rules().stale_after_failures {
                findings.push(stale_finding(&airport.icao, streak));
            }
            state.sweep_and_ingest(&airport.icao, &findings, now)
        }));
    }
    for result in join_all(handles).await {
        match result {
            Ok((expired, outcome)) => {
                report.expired.extend(expired);
                report.created.extend(outcome.created);
                report.updated.extend(outcome.updated);
            }
            Err(err) => tracing::error!(error = %err, "airport analysis task panicked"),
        }
    }

    // 5. Publish only after every partition's mutations are final.
    for advisory in report.created.iter().chain(report.updated.iter()) {
        state.publish(unicom_core::EngineEvent::Advisory(advisory.clone()));
    }
    report.published_tracks = state.publish_track_movements(&tracks);

    state.bump_tick();
    report
}

/// Status advisory for an airport whose feed has been failing persistently:
/// traffic must degrade visibly, never vanish silently.
fn stale_finding(icao: &str, streak: u32) -> Finding {
    Finding {
        airport: icao.to_string(),
        category: Category::Stale,
        severity: Severity::Caution,
        tracks: BTreeSet::new(),
        message: format!(
            "Telemetry feed unavailable for {icao} ({streak} consecutive polls); traffic picture is stale"
        ),
    }
}
