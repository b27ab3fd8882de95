use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::engine::matcher::MatchCandidate;
use crate::error::DispatchError;
use crate::geo::haversine_km;
use crate::models::worker::{GeoPoint, Worker};
use crate::state::AppState;
use crate::store::StoreError;

/// Registry operations for workers. All writes go through the store's
/// compare-and-swap; a lost race against another writer is retried from a
/// fresh read, never overwritten blind.
pub fn register(
    state: &AppState,
    id: Uuid,
    name: String,
    location: GeoPoint,
    rating: f64,
) -> Result<Worker, DispatchError> {
    if name.trim().is_empty() {
        return Err(DispatchError::BadRequest("name cannot be empty".to_string()));
    }

    if !location.is_valid() {
        return Err(DispatchError::BadRequest(format!(
            "invalid coordinate ({}, {})",
            location.lat, location.lng
        )));
    }

    let worker = Worker::new(id, name, location, rating);
    state.workers.insert(worker.clone()).map_err(|err| match err {
        StoreError::Duplicate(id) => DispatchError::DuplicateWorker(id),
        other => DispatchError::Internal(other.to_string()),
    })?;

    refresh_available_gauge(state);
    Ok(worker)
}

pub fn set_availability(
    state: &AppState,
    id: Uuid,
    available: bool,
) -> Result<Worker, DispatchError> {
    loop {
        let current = state
            .workers
            .get(id)
            .ok_or(DispatchError::UnknownWorker(id))?;

        if current.available == available {
            return Ok(current);
        }

        if available && current.current_job.is_some() {
            return Err(DispatchError::BadRequest(format!(
                "worker {id} still holds a job and cannot go available"
            )));
        }

        let mut updated = current.clone();
        updated.available = available;

        match state.workers.update(current.version, updated) {
            Ok(worker) => {
                refresh_available_gauge(state);
                return Ok(worker);
            }
            Err(StoreError::VersionConflict(_)) => continue,
            Err(other) => return Err(DispatchError::Internal(other.to_string())),
        }
    }
}

pub fn update_location(
    state: &AppState,
    id: Uuid,
    location: GeoPoint,
    timestamp: DateTime<Utc>,
) -> Result<Worker, DispatchError> {
    if !location.is_valid() {
        return Err(DispatchError::BadRequest(format!(
            "invalid coordinate ({}, {})",
            location.lat, location.lng
        )));
    }

    loop {
        let current = state
            .workers
            .get(id)
            .ok_or(DispatchError::UnknownWorker(id))?;

        if timestamp < current.location_updated_at {
            return Err(DispatchError::StaleUpdate(id));
        }

        let mut updated = current.clone();
        updated.location = location;
        updated.location_updated_at = timestamp;

        match state.workers.update(current.version, updated) {
            Ok(worker) => return Ok(worker),
            Err(StoreError::VersionConflict(_)) => continue,
            Err(other) => return Err(DispatchError::Internal(other.to_string())),
        }
    }
}

/// Snapshot of available workers within `radius_km` of `near`, nearest
/// first, capped at `limit`. Matching works off this snapshot; nothing is
/// locked across the scan.
pub fn list_available(
    state: &AppState,
    near: &GeoPoint,
    radius_km: f64,
    limit: usize,
) -> Vec<MatchCandidate> {
    let mut candidates: Vec<MatchCandidate> = state
        .workers
        .list()
        .into_iter()
        .filter(|worker| worker.available && worker.current_job.is_none())
        .filter_map(|worker| {
            let distance_km = haversine_km(&worker.location, near);
            (distance_km <= radius_km).then_some(MatchCandidate {
                worker,
                distance_km,
            })
        })
        .collect();

    candidates.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    candidates.truncate(limit);
    candidates
}

/// Return a worker to the pool after its job reached a terminal state (or
/// after a failed assignment). Clears the job, restores availability and,
/// when `completed`, bumps the completed-job count.
pub fn release(
    state: &AppState,
    id: Uuid,
    completed: bool,
) -> Result<Worker, DispatchError> {
    loop {
        let current = state
            .workers
            .get(id)
            .ok_or(DispatchError::UnknownWorker(id))?;

        let mut updated = current.clone();
        updated.current_job = None;
        updated.available = true;
        if completed {
            updated.completed_jobs += 1;
        }

        match state.workers.update(current.version, updated) {
            Ok(worker) => {
                refresh_available_gauge(state);
                return Ok(worker);
            }
            Err(StoreError::VersionConflict(_)) => continue,
            Err(other) => return Err(DispatchError::Internal(other.to_string())),
        }
    }
}

pub fn refresh_available_gauge(state: &AppState) {
    let available = state
        .workers
        .list()
        .iter()
        .filter(|worker| worker.available)
        .count();
    state.metrics.workers_available.set(available as i64);
}
