//! Shared in-memory state for the monitor.
//!
//! The track table is the single cross-airport shared resource: written by
//! the normalizer via keyed upserts, read by every router/analyzer pass.
//! DashMap gives per-id atomicity without blocking writes to other ids.
//! Advisory books are partitioned per airport, so parallel airport tasks
//! never contend on advisory state.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use unicom_core::normalize::{apply_record, BatchStats, RawStateRecord, UpsertDecision};
use unicom_core::spatial::haversine_distance;
use unicom_core::{
    sort_ranked, Advisory, AdvisoryBook, AircraftTrack, AirportContext, EngineEvent, EngineRules,
    Finding, IngestOutcome, Position,
};

pub struct AppState {
    airports: Vec<AirportContext>,
    rules: EngineRules,
    tracks: DashMap<String, AircraftTrack>,
    books: DashMap<String, AdvisoryBook>,
    /// Last position published per track, for the movement noise gate.
    last_published: DashMap<String, Position>,
    /// Consecutive failed polls per airport.
    feed_failures: DashMap<String, u32>,
    /// Change-event fanout to WebSocket subscribers. Best-effort: lagging
    /// receivers drop events and resync from the REST surface.
    pub tx: broadcast::Sender<EngineEvent>,
    ticks: AtomicU64,
    total_upserted: AtomicU64,
    total_stale_discarded: AtomicU64,
    total_malformed: AtomicU64,
}

impl AppState {
    pub fn new(airports: Vec<AirportContext>, rules: EngineRules) -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            airports,
            rules,
            tracks: DashMap::new(),
            books: DashMap::new(),
            last_published: DashMap::new(),
            feed_failures: DashMap::new(),
            tx,
            ticks: AtomicU64::new(0),
            total_upserted: AtomicU64::new(0),
            total_stale_discarded: AtomicU64::new(0),
            total_malformed: AtomicU64::new(0),
        }
    }

    pub fn airports(&self) -> &[AirportContext] {
        &self.airports
    }

    pub fn airport(&self, icao: &str) -> Option<&AirportContext> {
        self.airports.iter().find(|a| a.icao == icao)
    }

    pub fn rules(&self) -> &EngineRules {
        &self.rules
    }

    /// Upsert a batch into the track table. Per-id writes are atomic to
    /// readers; the monotonic-timestamp rule decides whether a sample lands.
    pub fn apply_records(
        &self,
        records: &[RawStateRecord],
        batch_time: DateTime<Utc>,
    ) -> BatchStats {
        let mut stats = BatchStats::default();
        for record in records {
            let Some(id) = record.id.clone() else {
                stats.malformed += 1;
                continue;
            };
            let decision = match self.tracks.entry(id) {
                Entry::Occupied(mut entry) => {
                    let decision = apply_record(Some(entry.get()), record, batch_time);
                    if let UpsertDecision::Apply(track) = &decision {
                        entry.insert(track.clone());
                    }
                    decision
                }
                Entry::Vacant(entry) => {
                    let decision = apply_record(None, record, batch_time);
                    if let UpsertDecision::Apply(track) = &decision {
                        entry.insert(track.clone());
                    }
                    decision
                }
            };
            match decision {
                UpsertDecision::Apply(_) => stats.upserted += 1,
                UpsertDecision::StaleDiscard => stats.stale_discarded += 1,
                UpsertDecision::Malformed => stats.malformed += 1,
            }
        }
        stats
    }

    /// Drop tracks unseen for longer than the eviction window.
    pub fn evict_stale(&self, now: DateTime<Utc>) -> usize {
        let window = self.rules.eviction_window();
        let expired: Vec<String> = self
            .tracks
            .iter()
            .filter(|entry| now - entry.value().timestamp > window)
            .map(|entry| entry.key().clone())
            .collect();
        for id in &expired {
            self.tracks.remove(id);
            self.last_published.remove(id);
        }
        expired.len()
    }

    /// Stable snapshot of the track table, sorted by id.
    pub fn tracks_snapshot(&self) -> Vec<AircraftTrack> {
        let mut tracks: Vec<AircraftTrack> =
            self.tracks.iter().map(|e| e.value().clone()).collect();
        tracks.sort_by(|a, b| a.id.cmp(&b.id));
        tracks
    }

    /// Expiry sweep followed by finding ingestion for one airport partition.
    /// The sweep runs first so a finding recurring in the tick an advisory
    /// lapses opens a fresh advisory instead of reviving the old one.
    pub fn sweep_and_ingest(
        &self,
        icao: &str,
        findings: &[Finding],
        now: DateTime<Utc>,
    ) -> (Vec<Advisory>, IngestOutcome) {
        let mut book = self
            .books
            .entry(icao.to_string())
            .or_insert_with(|| AdvisoryBook::new(icao));
        let expired = book.sweep_expired(now);
        let outcome = book.ingest(findings, now, &self.rules);
        (expired, outcome)
    }

    /// Open advisories, ranked. The `expires_at > now` filter keeps the read
    /// surface honest between sweeps: an advisory past its expiry never shows
    /// up even if the next tick hasn't swept it yet.
    pub fn active_advisories(&self, airport: Option<&str>, now: DateTime<Utc>) -> Vec<Advisory> {
        let mut advisories: Vec<Advisory> = match airport {
            Some(icao) => self
                .books
                .get(icao)
                .map(|book| book.active())
                .unwrap_or_default(),
            None => self.books.iter().flat_map(|book| book.active()).collect(),
        };
        advisories.retain(|a| a.expires_at > now);
        sort_ranked(&mut advisories);
        advisories
    }

    /// Record a poll outcome; returns the airport's failure streak.
    pub fn feed_result(&self, icao: &str, success: bool) -> u32 {
        if success {
            self.feed_failures.insert(icao.to_string(), 0);
            0
        } else {
            let mut streak = self.feed_failures.entry(icao.to_string()).or_insert(0);
            *streak += 1;
            *streak
        }
    }

    pub fn failure_streak(&self, icao: &str) -> u32 {
        self.feed_failures.get(icao).map(|s| *s).unwrap_or(0)
    }

    pub fn failure_streaks(&self) -> HashMap<String, u32> {
        self.feed_failures
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect()
    }

    pub fn publish(&self, event: EngineEvent) {
        // No subscribers is fine; the REST surface is the fallback.
        let _ = self.tx.send(event);
    }

    /// Publish a track event for every track that moved beyond the noise
    /// threshold since it was last published (or was never published).
    pub fn publish_track_movements(&self, tracks: &[AircraftTrack]) -> usize {
        let mut published = 0;
        for track in tracks {
            let Some(pos) = track.position else { continue };
            let moved = match self.last_published.get(&track.id) {
                Some(prev) => {
                    haversine_distance(prev.lat, prev.lon, pos.lat, pos.lon)
                        > self.rules.publish_move_threshold_m
                }
                None => true,
            };
            if moved {
                self.last_published.insert(track.id.clone(), pos);
                self.publish(EngineEvent::Track(track.clone()));
                published += 1;
            }
        }
        published
    }

    pub fn bump_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn record_batch_stats(&self, stats: BatchStats) {
        self.total_upserted.fetch_add(stats.upserted, Ordering::Relaxed);
        self.total_stale_discarded
            .fetch_add(stats.stale_discarded, Ordering::Relaxed);
        self.total_malformed
            .fetch_add(stats.malformed, Ordering::Relaxed);
    }

    pub fn batch_totals(&self) -> BatchStats {
        BatchStats {
            upserted: self.total_upserted.load(Ordering::Relaxed),
            stale_discarded: self.total_stale_discarded.load(Ordering::Relaxed),
            malformed: self.total_malformed.load(Ordering::Relaxed),
        }
    }
}
