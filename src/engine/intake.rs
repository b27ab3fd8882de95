use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::DispatchError;
use crate::models::event::JobEvent;
use crate::models::job::{Job, JobKind, JobState};
use crate::models::worker::GeoPoint;
use crate::state::AppState;
use crate::store::StoreError;

/// Raw submission from the outer layer, normalized here into a canonical
/// job record.
#[derive(Debug, Clone, Deserialize)]
pub struct JobRequest {
    pub kind: JobKind,
    pub requester_id: Uuid,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub scheduled_at: Option<DateTime<Utc>>,
}

pub fn create_job(state: &AppState, request: JobRequest) -> Result<Job, DispatchError> {
    for (label, point) in [("pickup", &request.pickup), ("dropoff", &request.dropoff)] {
        if !point.is_valid() {
            return Err(DispatchError::BadRequest(format!(
                "invalid {label} coordinate ({}, {})",
                point.lat, point.lng
            )));
        }
    }

    let job = Job {
        id: Uuid::new_v4(),
        requester_id: request.requester_id,
        kind: request.kind,
        pickup: request.pickup,
        dropoff: request.dropoff,
        requested_at: Utc::now(),
        scheduled_at: request.scheduled_at,
        state: JobState::Requested,
        worker_id: None,
        charge: None,
        cancel_reason: None,
        assigned_at: None,
        started_at: None,
        finished_at: None,
        version: 0,
    };

    state.jobs.insert(job.clone()).map_err(|err| match err {
        StoreError::Duplicate(id) => DispatchError::Internal(format!("job id collision: {id}")),
        other => DispatchError::Internal(other.to_string()),
    })?;

    state.emit(JobEvent {
        job_id: job.id,
        worker_id: None,
        state: JobState::Requested,
        at: job.requested_at,
    });

    Ok(job)
}
