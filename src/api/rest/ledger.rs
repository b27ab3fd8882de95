use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use uuid::Uuid;

use crate::error::DispatchError;
use crate::models::job::{JobKind, JobState};
use crate::models::ledger::LedgerEntry;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ledger", get(list_entries))
        .route("/ledger/:job_id", get(get_entry))
        .route("/stats", get(stats))
}

async fn list_entries(State(state): State<Arc<AppState>>) -> Json<Vec<LedgerEntry>> {
    Json(state.ledger.list())
}

async fn get_entry(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<LedgerEntry>, DispatchError> {
    let entry = state
        .ledger
        .get(job_id)
        .ok_or_else(|| DispatchError::NotFound(format!("no ledger entry for job {job_id}")))?;
    Ok(Json(entry))
}

#[derive(Serialize)]
struct StatsResponse {
    total_rides: usize,
    total_deliveries: usize,
    active_jobs: usize,
    completed_jobs: usize,
    cancelled_jobs: usize,
    total_revenue: f64,
}

/// Platform-wide rollup for the monitoring surface.
async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let jobs = state.jobs.list();

    let mut response = StatsResponse {
        total_rides: 0,
        total_deliveries: 0,
        active_jobs: 0,
        completed_jobs: 0,
        cancelled_jobs: 0,
        total_revenue: 0.0,
    };

    for job in &jobs {
        match job.kind {
            JobKind::Ride => response.total_rides += 1,
            JobKind::Delivery => response.total_deliveries += 1,
        }
        match job.state {
            JobState::Assigned | JobState::InProgress => response.active_jobs += 1,
            JobState::Completed => response.completed_jobs += 1,
            JobState::Cancelled => response.cancelled_jobs += 1,
            JobState::Requested => {}
        }
    }

    response.total_revenue = state
        .ledger
        .list()
        .iter()
        .map(|entry| entry.charge)
        .sum();

    Json(response)
}
