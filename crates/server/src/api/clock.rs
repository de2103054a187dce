use std::sync::Arc;

use crate::{
    dto::{ClockDto, ClockUpdateDto},
    state::AppState,
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use tokyo_motion::shared::Timestamp;
use tracing::error;

pub async fn clock(State(state): State<Arc<AppState>>) -> Result<Response, StatusCode> {
    let engine = state.engine.lock().await;
    Ok(Json(ClockDto::from(engine.clock())).into_response())
}

pub async fn set_clock(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ClockUpdateDto>,
) -> Result<Response, StatusCode> {
    let date = update
        .date
        .as_deref()
        .map(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d"))
        .transpose()
        .map_err(|err| {
            error!("Invalid date: {err}");
            StatusCode::BAD_REQUEST
        })?;
    if update.speed.is_some_and(|speed| !speed.is_finite() || speed < 0.0) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let mut engine = state.engine.lock().await;
    if update.reset {
        engine.reset_clock();
    }
    if let Some(date) = date {
        engine.set_date(date);
    }
    if let Some(time) = update.time.filter(|time| time.is_finite()) {
        engine.set_time(Timestamp::from_millis(time));
    }
    if let Some(speed) = update.speed {
        engine.set_speed(speed);
    }
    Ok(Json(ClockDto::from(engine.clock())).into_response())
}
