//! UNICOM server - always-on safety monitor for non-towered airports.

use anyhow::{Context, Result};
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use unicom_core::EngineRules;
use unicom_feed::FeedClient;
use unicom_server::config::Config;
use unicom_server::loops::engine_loop::run_engine_loop;
use unicom_server::state::AppState;
use unicom_server::{api, geometry};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("unicom_server=debug".parse()?),
        )
        .init();

    tracing::info!("Starting UNICOM safety monitor...");

    let config = Config::from_env();

    // Geometry problems abort startup; a running tick never depends on the
    // store again.
    let airports = geometry::load_airports(&config.airports_path)
        .with_context(|| format!("loading airport geometry from {}", config.airports_path))?;
    tracing::info!(airports = airports.len(), "airport geometry loaded");

    let state = Arc::new(AppState::new(airports, EngineRules::default()));
    let feed = FeedClient::new(
        &config.feed_url,
        config.feed_username.clone(),
        config.feed_password.clone(),
        Duration::from_secs(config.feed_timeout_secs),
    )
    .context("building feed client")?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let engine = tokio::spawn(run_engine_loop(
        state.clone(),
        feed,
        Duration::from_secs(config.tick_interval_secs),
        shutdown_rx,
    ));

    let app = api::routes()
        .route("/health", get(|| async { "OK" }))
        .route("/v1/stream", get(api::ws::ws_handler))
        .with_state(state)
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the tick loop; any in-flight tick runs to completion first.
    let _ = shutdown_tx.send(true);
    engine.await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown requested");
}
