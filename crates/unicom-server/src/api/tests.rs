use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use crate::{api, state::AppState};
use unicom_core::{AirportContext, EngineRules, Position, RawStateRecord, Runway};

fn test_airport() -> AirportContext {
    AirportContext {
        icao: "KRHV".into(),
        name: "Reid-Hillview".into(),
        position: Position::new(37.3329, -121.8195),
        radius_m: 18_520.0,
        runways: vec![Runway {
            ident: "31R".into(),
            heading_deg: 310.0,
            length_m: 946.0,
            width_m: 23.0,
            threshold: Position::new(37.3299, -121.8157),
            reciprocal_threshold: Position::new(37.3359, -121.8233),
            active: true,
        }],
    }
}

fn setup_app() -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(vec![test_airport()], EngineRules::default()));
    let app = api::routes().with_state(state.clone());
    (app, state)
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

#[tokio::test]
async fn advisories_start_empty() {
    let (app, _state) = setup_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/advisories")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn unknown_airport_is_not_found() {
    let (app, _state) = setup_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/advisories?airport=KZZZ")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn tracks_report_health() {
    let (app, state) = setup_app();

    let record = RawStateRecord {
        id: Some("abc123".into()),
        lat: Some(37.3340),
        lon: Some(-121.8200),
        altitude_m: Some(450.0),
        timestamp: Some(Utc::now()),
        ..RawStateRecord::default()
    };
    let stats = state.apply_records(&[record], Utc::now());
    assert_eq!(stats.upserted, 1);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/tracks?airport=KRHV")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], "abc123");
    assert_eq!(body[0]["health"], "fresh");
}

#[tokio::test]
async fn status_reports_counters() {
    let (app, state) = setup_app();
    state.bump_tick();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["ticks"], 1);
    assert_eq!(body["batch_totals"]["malformed"], 0);
}
