use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{patch, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::pool;
use crate::error::DispatchError;
use crate::models::worker::{GeoPoint, Worker};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/workers", post(register_worker).get(list_workers))
        .route("/workers/:id/availability", patch(update_availability))
        .route("/workers/:id/location", patch(update_location))
}

#[derive(Deserialize)]
pub struct RegisterWorkerRequest {
    /// Caller-supplied identity (e.g. from the auth layer); generated when
    /// absent.
    pub id: Option<Uuid>,
    pub name: String,
    pub location: GeoPoint,
    #[serde(default = "default_rating")]
    pub rating: f64,
}

fn default_rating() -> f64 {
    5.0
}

#[derive(Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub available: bool,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
    /// When the fix was taken, so late-arriving updates can be refused.
    pub timestamp: Option<DateTime<Utc>>,
}

async fn register_worker(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterWorkerRequest>,
) -> Result<Json<Worker>, DispatchError> {
    let id = payload.id.unwrap_or_else(Uuid::new_v4);
    let worker = pool::register(&state, id, payload.name, payload.location, payload.rating)?;
    Ok(Json(worker))
}

async fn list_workers(State(state): State<Arc<AppState>>) -> Json<Vec<Worker>> {
    Json(state.workers.list())
}

async fn update_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAvailabilityRequest>,
) -> Result<Json<Worker>, DispatchError> {
    let worker = pool::set_availability(&state, id, payload.available)?;
    Ok(Json(worker))
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<Worker>, DispatchError> {
    let timestamp = payload.timestamp.unwrap_or_else(Utc::now);
    let worker = pool::update_location(&state, id, payload.location, timestamp)?;
    Ok(Json(worker))
}
