use chrono::Duration;
use tracing::warn;

use crate::error::DispatchError;
use crate::geo::haversine_km;
use crate::models::job::{Job, JobState};
use crate::models::ledger::LedgerEntry;
use crate::state::AppState;

/// Record the charge for a completed job exactly once.
///
/// Idempotent on the job id: a repeat call returns the entry recorded the
/// first time, charge untouched, so a retried completion can never bill
/// twice. The fare itself comes from the injected [`FarePolicy`]
/// collaborator.
///
/// [`FarePolicy`]: crate::pricing::FarePolicy
pub fn finalize(state: &AppState, job: &Job) -> Result<LedgerEntry, DispatchError> {
    if let Some(existing) = state.ledger.get(job.id) {
        return Ok(existing);
    }

    if job.state != JobState::Completed {
        return Err(DispatchError::IllegalTransition {
            job_id: job.id,
            state: job.state,
            action: "finalize",
        });
    }

    let worker_id = job.worker_id.ok_or_else(|| {
        DispatchError::Internal(format!("completed job {} has no worker", job.id))
    })?;

    let distance_km = haversine_km(&job.pickup, &job.dropoff);
    let duration = match (job.started_at, job.finished_at) {
        (Some(started), Some(finished)) => finished - started,
        _ => Duration::zero(),
    };

    let charge = state.fares.charge(job.kind, distance_km, duration);
    let entry = LedgerEntry {
        job_id: job.id,
        worker_id,
        kind: job.kind,
        charge,
        worker_payout: state.fares.payout(job.kind, charge),
        recorded_at: chrono::Utc::now(),
    };

    state.ledger.insert(entry).map_err(|err| {
        warn!(job_id = %job.id, error = %err, "ledger write failed");
        DispatchError::FinalizationFailed(job.id)
    })
}
