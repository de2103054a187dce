mod api;
mod dto;
mod feed;
mod state;

use crate::state::AppState;
use axum::routing::{get, post};
use std::{sync::Arc, time::Instant};
use tokyo_motion::{prelude::*, schedule};
use tracing::{error, info, trace};

const PORT: u32 = 3000;
const FRAME_INTERVAL: std::time::Duration = std::time::Duration::from_micros(16_667);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    info!("Starting server...");
    let args: Vec<_> = std::env::args().collect();
    if args.len() < 2 {
        error!("Missing schedule bundle");
        std::process::exit(1);
    }
    let config = match args.get(2) {
        Some(path) => load_config(path),
        None => Config::default(),
    };

    info!("Loading data...");
    let now = Instant::now();
    let schedule = ScheduleReader::new(schedule::Config::default())
        .from_path(&args[1])
        .read()
        .unwrap_or_else(|err| {
            error!("Failed to read schedule: {err}");
            std::process::exit(1);
        });
    let engine = Engine::with_system_clock(schedule, config.clone()).unwrap_or_else(|err| {
        error!("Failed to build engine: {err}");
        std::process::exit(1);
    });
    let state = Arc::new(AppState::new(engine));
    info!("Loading data took {:?}", now.elapsed());

    tokio::spawn(frame_loop(state.clone()));
    if let Ok(url) = std::env::var("TRAIN_FEED_URL") {
        let interval = to_std(config.realtime.train_refresh_interval());
        tokio::spawn(feed::poll_trains(state.clone(), url, interval));
    }
    if let Ok(url) = std::env::var("FLIGHT_FEED_URL") {
        let interval = to_std(config.realtime.flight_refresh_interval());
        tokio::spawn(feed::poll_flights(state.clone(), url, interval));
    }

    let app = axum::Router::new()
        .route("/vehicles", get(api::vehicles))
        .route("/clock", get(api::clock).post(api::set_clock))
        .route("/track/{id}", post(api::track))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", PORT))
        .await
        .unwrap_or_else(|err| {
            error!("Failed to bind port {PORT}: {err}");
            std::process::exit(1);
        });
    info!("Listening to port {PORT}");
    if let Err(err) = axum::serve(listener, app).await {
        error!("Server stopped: {err}");
    }
}

/// Applies queued feed snapshots and advances the engine once per frame.
async fn frame_loop(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(FRAME_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        let mut engine = state.engine.lock().await;
        while let Some(snapshot) = state.train_snapshots.pop() {
            engine.apply_train_snapshot(&snapshot);
        }
        while let Some(snapshot) = state.flight_snapshots.pop() {
            engine.apply_flight_snapshot(&snapshot);
        }
        engine.tick();
        for event in engine.drain_events() {
            trace!("{event:?}");
        }
    }
}

fn load_config(path: &str) -> Config {
    let json = std::fs::read_to_string(path).unwrap_or_else(|err| {
        error!("Failed to read config {path}: {err}");
        std::process::exit(1);
    });
    Config::from_json(&json).unwrap_or_else(|err| {
        error!("Failed to parse config {path}: {err}");
        std::process::exit(1);
    })
}

fn to_std(duration: Duration) -> std::time::Duration {
    std::time::Duration::from_secs_f64(duration.as_seconds().max(0.0))
}
