use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use crate::engine::{ledger, pool};
use crate::error::DispatchError;
use crate::models::event::JobEvent;
use crate::models::job::{Job, JobState};
use crate::state::AppState;
use crate::store::StoreError;

/// State machine over jobs:
///
/// ```text
/// requested --assign--> assigned --start--> in_progress --complete--> completed
/// requested | assigned | in_progress --cancel--> cancelled
/// ```
///
/// Every transition is a compare-and-swap on the job record; a conflicting
/// writer forces a re-read, so an illegal transition is judged against the
/// state that actually won. Terminal jobs are archived in place, never
/// deleted.
pub fn assign(state: &AppState, job_id: Uuid, worker_id: Uuid) -> Result<Job, DispatchError> {
    let (_, assigned) = transition(state, job_id, |current| match current.state {
        JobState::Requested => {
            let mut next = current.clone();
            next.state = JobState::Assigned;
            next.worker_id = Some(worker_id);
            next.assigned_at = Some(Utc::now());
            Ok(next)
        }
        JobState::Cancelled => Err(DispatchError::IllegalTransition {
            job_id,
            state: current.state,
            action: "assign",
        }),
        state => Err(DispatchError::AlreadyAssigned { job_id, state }),
    })?;

    emit(state, &assigned);
    Ok(assigned)
}

pub fn start(state: &AppState, job_id: Uuid) -> Result<Job, DispatchError> {
    let (_, started) = transition(state, job_id, |current| match current.state {
        JobState::Assigned => {
            let mut next = current.clone();
            next.state = JobState::InProgress;
            next.started_at = Some(Utc::now());
            Ok(next)
        }
        state => Err(DispatchError::IllegalTransition {
            job_id,
            state,
            action: "start",
        }),
    })?;

    emit(state, &started);
    Ok(started)
}

/// Terminal transition for a fulfilled job. The ledger entry is written
/// synchronously inside the operation: if it cannot be recorded the job is
/// rolled back to `in_progress` (worker still attached) and the caller may
/// retry the whole completion.
pub fn complete(state: &AppState, job_id: Uuid) -> Result<Job, DispatchError> {
    let (previous, completed) = transition(state, job_id, |current| match current.state {
        JobState::InProgress => {
            if current.worker_id.is_none() {
                return Err(DispatchError::Internal(format!(
                    "job {job_id} is in_progress without a worker"
                )));
            }
            let mut next = current.clone();
            next.state = JobState::Completed;
            next.finished_at = Some(Utc::now());
            Ok(next)
        }
        state => Err(DispatchError::IllegalTransition {
            job_id,
            state,
            action: "complete",
        }),
    })?;

    let worker_id = previous
        .worker_id
        .ok_or_else(|| DispatchError::Internal(format!("job {job_id} lost its worker")))?;

    let entry = match ledger::finalize(state, &completed) {
        Ok(entry) => entry,
        Err(err) => {
            warn!(job_id = %job_id, error = %err, "finalization failed; rolling back");
            rollback_completion(state, &completed);
            return Err(DispatchError::FinalizationFailed(job_id));
        }
    };

    let finalized = record_charge(state, &completed, entry.charge)?;

    pool::release(state, worker_id, true)?;
    state
        .metrics
        .jobs_terminal_total
        .with_label_values(&["completed"])
        .inc();
    emit(state, &finalized);
    Ok(finalized)
}

/// Requester-initiated abort, legal from any non-terminal state. Releases
/// the worker (when one was attached) before returning.
pub fn cancel(state: &AppState, job_id: Uuid, reason: String) -> Result<Job, DispatchError> {
    let (previous, cancelled) = transition(state, job_id, |current| match current.state {
        JobState::Requested | JobState::Assigned | JobState::InProgress => {
            let mut next = current.clone();
            next.state = JobState::Cancelled;
            next.worker_id = None;
            next.cancel_reason = Some(reason.clone());
            next.finished_at = Some(Utc::now());
            Ok(next)
        }
        state => Err(DispatchError::IllegalTransition {
            job_id,
            state,
            action: "cancel",
        }),
    })?;

    if let Some(worker_id) = previous.worker_id {
        pool::release(state, worker_id, false)?;
    }

    state
        .metrics
        .jobs_terminal_total
        .with_label_values(&["cancelled"])
        .inc();
    emit(state, &cancelled);
    Ok(cancelled)
}

/// Compare-and-swap transition loop. Returns the record as it was before
/// the swap together with the stored result. A version conflict means a
/// concurrent transition landed first; the decision is re-taken against the
/// fresh state, so the closure's rejection always names the winning state.
fn transition<F>(state: &AppState, job_id: Uuid, decide: F) -> Result<(Job, Job), DispatchError>
where
    F: Fn(&Job) -> Result<Job, DispatchError>,
{
    loop {
        let current = state
            .jobs
            .get(job_id)
            .ok_or_else(|| DispatchError::NotFound(format!("job {job_id} not found")))?;

        let next = decide(&current)?;

        match state.jobs.update(current.version, next) {
            Ok(stored) => return Ok((current, stored)),
            Err(StoreError::VersionConflict(_)) => continue,
            Err(other) => return Err(DispatchError::Internal(other.to_string())),
        }
    }
}

fn record_charge(state: &AppState, completed: &Job, charge: f64) -> Result<Job, DispatchError> {
    let mut finalized = completed.clone();
    finalized.charge = Some(charge);
    state
        .jobs
        .update(completed.version, finalized)
        .map_err(|err| DispatchError::Internal(err.to_string()))
}

fn rollback_completion(state: &AppState, completed: &Job) {
    let mut restored = completed.clone();
    restored.state = JobState::InProgress;
    restored.finished_at = None;

    if let Err(err) = state.jobs.update(completed.version, restored) {
        warn!(job_id = %completed.id, error = %err, "rollback of failed completion did not land");
    }
}

fn emit(state: &AppState, job: &Job) {
    state.emit(JobEvent {
        job_id: job.id,
        worker_id: job.worker_id,
        state: job.state,
        at: Utc::now(),
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::{assign, cancel, complete, start};
    use crate::engine::{matcher, testutil};
    use crate::error::DispatchError;
    use crate::models::job::{JobKind, JobState};
    use crate::models::ledger::LedgerEntry;
    use crate::store::{LedgerStore, StoreError};

    fn assigned_job(state: &crate::state::AppState) -> (crate::models::job::Job, Uuid) {
        let worker = testutil::register_worker(state, 0.0, 0.0, 4.5);
        let job = testutil::create_job(state, JobKind::Ride, 0.0, 0.0);
        let assigned = matcher::match_job(state, job.id).unwrap();
        assert_eq!(assigned.worker_id, Some(worker.id));
        (assigned, worker.id)
    }

    #[test]
    fn complete_on_requested_job_is_illegal() {
        let (state, _rx) = testutil::state();
        let job = testutil::create_job(&state, JobKind::Ride, 0.0, 0.0);

        let err = complete(&state, job.id).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::IllegalTransition {
                state: JobState::Requested,
                action: "complete",
                ..
            }
        ));

        assert_eq!(state.jobs.get(job.id).unwrap().state, JobState::Requested);
    }

    #[test]
    fn start_requires_assigned() {
        let (state, _rx) = testutil::state();
        let job = testutil::create_job(&state, JobKind::Ride, 0.0, 0.0);

        let err = start(&state, job.id).unwrap_err();
        assert!(matches!(err, DispatchError::IllegalTransition { action: "start", .. }));
    }

    #[test]
    fn assign_twice_reports_already_assigned() {
        let (state, _rx) = testutil::state();
        let (job, worker_id) = assigned_job(&state);

        let err = assign(&state, job.id, worker_id).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::AlreadyAssigned {
                state: JobState::Assigned,
                ..
            }
        ));
    }

    #[test]
    fn full_lifecycle_completes_and_frees_the_worker() {
        let (state, _rx) = testutil::state();
        let (job, worker_id) = assigned_job(&state);

        start(&state, job.id).unwrap();
        let done = complete(&state, job.id).unwrap();

        assert_eq!(done.state, JobState::Completed);
        assert!(done.charge.unwrap() > 0.0);
        assert_eq!(done.worker_id, Some(worker_id));

        let worker = state.workers.get(worker_id).unwrap();
        assert!(worker.available);
        assert!(worker.current_job.is_none());
        assert_eq!(worker.completed_jobs, 1);
    }

    #[test]
    fn cancel_after_assignment_releases_the_worker() {
        let (state, _rx) = testutil::state();
        let (job, worker_id) = assigned_job(&state);

        let cancelled = cancel(&state, job.id, "user request".to_string()).unwrap();

        assert_eq!(cancelled.state, JobState::Cancelled);
        assert!(cancelled.worker_id.is_none());
        assert_eq!(cancelled.cancel_reason.as_deref(), Some("user request"));

        let worker = state.workers.get(worker_id).unwrap();
        assert!(worker.available);
        assert!(worker.current_job.is_none());
        // a cancelled job does not count as completed work
        assert_eq!(worker.completed_jobs, 0);
    }

    #[test]
    fn cancel_is_terminal() {
        let (state, _rx) = testutil::state();
        let job = testutil::create_job(&state, JobKind::Delivery, 0.0, 0.0);
        cancel(&state, job.id, "first".to_string()).unwrap();

        let err = cancel(&state, job.id, "second".to_string()).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::IllegalTransition {
                state: JobState::Cancelled,
                action: "cancel",
                ..
            }
        ));
    }

    #[test]
    fn in_progress_job_can_be_cancelled() {
        let (state, _rx) = testutil::state();
        let (job, worker_id) = assigned_job(&state);
        start(&state, job.id).unwrap();

        let cancelled = cancel(&state, job.id, "rider no-show".to_string()).unwrap();
        assert_eq!(cancelled.state, JobState::Cancelled);
        assert!(state.workers.get(worker_id).unwrap().available);
    }

    /// Ledger stub whose writes always fail, for exercising the rollback
    /// path of `complete`.
    struct BrokenLedger;

    impl LedgerStore for BrokenLedger {
        fn insert(&self, entry: LedgerEntry) -> Result<LedgerEntry, StoreError> {
            Err(StoreError::Backend(format!(
                "write refused for job {}",
                entry.job_id
            )))
        }

        fn get(&self, _job_id: Uuid) -> Option<LedgerEntry> {
            None
        }

        fn list(&self) -> Vec<LedgerEntry> {
            Vec::new()
        }
    }

    #[test]
    fn failed_finalization_rolls_the_job_back() {
        let (state, _rx) = testutil::state_with_ledger(Arc::new(BrokenLedger));
        let (job, worker_id) = assigned_job(&state);
        start(&state, job.id).unwrap();

        let err = complete(&state, job.id).unwrap_err();
        assert!(matches!(err, DispatchError::FinalizationFailed(_)));

        // job is retryable, worker still attached
        let stored = state.jobs.get(job.id).unwrap();
        assert_eq!(stored.state, JobState::InProgress);
        assert!(stored.charge.is_none());
        assert!(stored.finished_at.is_none());

        let worker = state.workers.get(worker_id).unwrap();
        assert!(!worker.available);
        assert_eq!(worker.current_job, Some(job.id));
    }

    #[test]
    fn events_are_emitted_per_transition() {
        let (state, _rx) = testutil::state();
        let mut events = state.job_events_tx.subscribe();

        let (job, _) = assigned_job(&state);
        start(&state, job.id).unwrap();
        complete(&state, job.id).unwrap();

        let states: Vec<JobState> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|event| event.state)
            .collect();
        assert_eq!(
            states,
            vec![
                JobState::Requested,
                JobState::Assigned,
                JobState::InProgress,
                JobState::Completed
            ]
        );
    }

    #[test]
    fn availability_invariant_holds_after_every_operation() {
        let (state, _rx) = testutil::state();
        let check = |state: &crate::state::AppState| {
            for worker in state.workers.list() {
                assert_eq!(worker.available, worker.current_job.is_none());
            }
        };

        let worker = testutil::register_worker(&state, 0.0, 0.0, 4.2);
        check(&state);

        let job = testutil::create_job(&state, JobKind::Ride, 0.0, 0.0);
        matcher::match_job(&state, job.id).unwrap();
        check(&state);

        start(&state, job.id).unwrap();
        check(&state);

        complete(&state, job.id).unwrap();
        check(&state);

        assert!(state.workers.get(worker.id).unwrap().available);
    }
}
