use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::intake::{self, JobRequest};
use crate::engine::lifecycle;
use crate::engine::queue::enqueue_job;
use crate::error::DispatchError;
use crate::models::job::Job;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs", post(create_job))
        .route("/jobs/:id", get(get_job))
        .route("/jobs/:id/start", post(start_job))
        .route("/jobs/:id/complete", post(complete_job))
        .route("/jobs/:id/cancel", post(cancel_job))
}

#[derive(Deserialize)]
pub struct CancelJobRequest {
    pub reason: String,
}

async fn create_job(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<JobRequest>,
) -> Result<Json<Job>, DispatchError> {
    let job = intake::create_job(&state, payload)?;
    enqueue_job(&state, job.id).await?;
    Ok(Json(job))
}

async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, DispatchError> {
    let job = state
        .jobs
        .get(id)
        .ok_or_else(|| DispatchError::NotFound(format!("job {id} not found")))?;
    Ok(Json(job))
}

async fn start_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, DispatchError> {
    Ok(Json(lifecycle::start(&state, id)?))
}

async fn complete_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, DispatchError> {
    Ok(Json(lifecycle::complete(&state, id)?))
}

async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelJobRequest>,
) -> Result<Json<Job>, DispatchError> {
    Ok(Json(lifecycle::cancel(&state, id, payload.reason)?))
}
