//! REST read surface. Pure rendering of engine state; no decision logic.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::state::AppState;
use unicom_core::{in_vicinity, AircraftTrack, TrackHealth};

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/airports", get(list_airports))
        .route("/v1/tracks", get(list_tracks))
        .route("/v1/advisories", get(list_advisories))
        .route("/v1/status", get(status))
}

#[derive(Debug, Deserialize, Default)]
struct AirportQuery {
    airport: Option<String>,
}

/// Track plus its computed health, so consumers can grey out stale traffic
/// instead of watching it vanish.
#[derive(Debug, Serialize)]
struct TrackView {
    #[serde(flatten)]
    track: AircraftTrack,
    health: TrackHealth,
}

async fn list_airports(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.airports().to_vec())
}

async fn list_tracks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AirportQuery>,
) -> impl IntoResponse {
    let now = Utc::now();
    let max_staleness = state.rules().max_staleness();

    let tracks = match query.airport.as_deref() {
        Some(icao) => {
            let Some(airport) = state.airport(icao) else {
                return unknown_airport(icao).into_response();
            };
            state
                .tracks_snapshot()
                .into_iter()
                .filter(|t| in_vicinity(t, airport))
                .collect()
        }
        None => state.tracks_snapshot(),
    };

    let views: Vec<TrackView> = tracks
        .into_iter()
        .map(|track| TrackView {
            health: track.health(now, max_staleness),
            track,
        })
        .collect();
    Json(views).into_response()
}

async fn list_advisories(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AirportQuery>,
) -> impl IntoResponse {
    if let Some(icao) = query.airport.as_deref() {
        if state.airport(icao).is_none() {
            return unknown_airport(icao).into_response();
        }
    }
    let advisories = state.active_advisories(query.airport.as_deref(), Utc::now());
    Json(advisories).into_response()
}

async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let totals = state.batch_totals();
    Json(json!({
        "ticks": state.tick_count(),
        "tracks": state.tracks_snapshot().len(),
        "batch_totals": totals,
        "feed_failure_streaks": state.failure_streaks(),
    }))
}

fn unknown_airport(icao: &str) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("unknown airport {icao}") })),
    )
}
