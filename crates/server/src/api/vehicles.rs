use std::{collections::HashMap, sync::Arc};

use crate::{dto::VehicleDto, state::AppState};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tokyo_motion::shared::{Bounds, Coordinate};
use tracing::error;

/// Every active vehicle. `?bounds=south,west,north,east` also sets the viewport.
pub async fn vehicles(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, StatusCode> {
    let mut engine = state.engine.lock().await;
    if let Some(bounds) = params.get("bounds") {
        engine.set_viewport(Some(parse_bounds(bounds)?));
    }
    let result: Vec<_> = engine
        .index()
        .vehicles()
        .map(VehicleDto::from)
        .collect();
    Ok(Json(result).into_response())
}

pub async fn track(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, StatusCode> {
    let mut engine = state.engine.lock().await;
    if engine.track(&id) {
        Ok(().into_response())
    } else {
        error!("Cannot track unknown vehicle {id}");
        Err(StatusCode::NOT_FOUND)
    }
}

fn parse_bounds(value: &str) -> Result<Bounds, StatusCode> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|part| part.trim().parse())
        .collect::<Result<_, _>>()
        .map_err(|err| {
            error!("Invalid bounds {value}: {err}");
            StatusCode::BAD_REQUEST
        })?;
    let [south, west, north, east] = parts[..] else {
        return Err(StatusCode::BAD_REQUEST);
    };
    Ok(Bounds::new(
        Coordinate::from((south, west)),
        Coordinate::from((north, east)),
    ))
}
