use tracing::{debug, warn};
use uuid::Uuid;

use crate::engine::{lifecycle, pool};
use crate::error::DispatchError;
use crate::models::job::{Job, JobState};
use crate::models::worker::Worker;
use crate::state::AppState;

/// Transient ranking tuple; lives only for the duration of one match.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    pub worker: Worker,
    pub distance_km: f64,
}

/// Ranking applied to the candidate snapshot: nearest first, then highest
/// rating, then fewest completed jobs so less-recently-busy workers win the
/// final tie-break. Fully deterministic for equal inputs.
pub fn rank(candidates: &mut [MatchCandidate]) {
    candidates.sort_by(|a, b| {
        a.distance_km
            .total_cmp(&b.distance_km)
            .then(b.worker.rating.total_cmp(&a.worker.rating))
            .then(a.worker.completed_jobs.cmp(&b.worker.completed_jobs))
    });
}

/// Pick exactly one worker for a pending job, or report that none is
/// currently available.
///
/// Reservation is a compare-and-swap on the worker record, so two
/// concurrent matches can never book the same worker: the loser's swap
/// fails and it falls through to the next candidate. The job is only
/// touched afterwards, through `lifecycle::assign`; if that rejects (the
/// requester cancelled mid-flight), the reservation is rolled back before
/// the error propagates.
pub fn match_job(state: &AppState, job_id: Uuid) -> Result<Job, DispatchError> {
    let job = state
        .jobs
        .get(job_id)
        .ok_or_else(|| DispatchError::NotFound(format!("job {job_id} not found")))?;

    match job.state {
        JobState::Requested => {}
        // cancelled before we got here; same rejection assign() would give
        JobState::Cancelled => {
            return Err(DispatchError::IllegalTransition {
                job_id,
                state: job.state,
                action: "assign",
            })
        }
        state => return Err(DispatchError::AlreadyAssigned { job_id, state }),
    }

    let mut candidates =
        pool::list_available(state, &job.pickup, state.match_radius_km, state.match_limit);
    rank(&mut candidates);

    for candidate in candidates {
        let Some(reserved) = reserve(state, candidate.worker.id, job.id) else {
            debug!(
                job_id = %job.id,
                worker_id = %candidate.worker.id,
                "candidate taken by a concurrent match; trying next"
            );
            continue;
        };

        return match lifecycle::assign(state, job.id, reserved.id) {
            Ok(assigned) => Ok(assigned),
            Err(err) => {
                // The job moved under us (cancelled first, or another
                // assignment won). The worker we reserved must go back.
                if let Err(release_err) = pool::release(state, reserved.id, false) {
                    warn!(
                        worker_id = %reserved.id,
                        error = %release_err,
                        "failed to release worker after rejected assignment"
                    );
                }
                Err(err)
            }
        };
    }

    Err(DispatchError::NoWorkerAvailable)
}

/// Claim the worker by swapping available -> busy against its current
/// version. Returns `None` when the worker is gone, no longer available,
/// or the swap lost a race; the caller just moves on to the next candidate.
fn reserve(state: &AppState, worker_id: Uuid, job_id: Uuid) -> Option<Worker> {
    let current = state.workers.get(worker_id)?;
    if !current.available || current.current_job.is_some() {
        return None;
    }

    let mut reserved = current.clone();
    reserved.available = false;
    reserved.current_job = Some(job_id);

    let reserved = state.workers.update(current.version, reserved).ok()?;
    pool::refresh_available_gauge(state);
    Some(reserved)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::match_job;
    use crate::engine::{lifecycle, testutil};
    use crate::error::DispatchError;
    use crate::models::job::{JobKind, JobState};

    #[test]
    fn nearest_worker_wins() {
        let (state, _rx) = testutil::state();
        let near = testutil::register_worker(&state, 0.0, 0.0, 4.9);
        let _far = testutil::register_worker(&state, 0.01, 0.0, 4.5);
        let job = testutil::create_job(&state, JobKind::Ride, 0.0, 0.0);

        let assigned = match_job(&state, job.id).unwrap();

        assert_eq!(assigned.state, JobState::Assigned);
        assert_eq!(assigned.worker_id, Some(near.id));
    }

    #[test]
    fn rating_breaks_distance_tie() {
        let (state, _rx) = testutil::state();
        let _low = testutil::register_worker(&state, 0.0, 0.0, 4.0);
        let high = testutil::register_worker(&state, 0.0, 0.0, 4.9);
        let job = testutil::create_job(&state, JobKind::Ride, 0.0, 0.0);

        let assigned = match_job(&state, job.id).unwrap();
        assert_eq!(assigned.worker_id, Some(high.id));
    }

    #[test]
    fn completed_jobs_break_rating_tie() {
        let (state, _rx) = testutil::state();
        let veteran = testutil::register_worker(&state, 0.0, 0.0, 4.5);
        let idle = testutil::register_worker(&state, 0.0, 0.0, 4.5);

        // veteran just finished a job; the idle worker should get the next one
        let first = testutil::create_job(&state, JobKind::Ride, 0.0, 0.0);
        let current = state.workers.get(veteran.id).unwrap();
        let mut reserved = current.clone();
        reserved.available = false;
        reserved.current_job = Some(first.id);
        state.workers.update(current.version, reserved).unwrap();
        lifecycle::assign(&state, first.id, veteran.id).unwrap();
        lifecycle::start(&state, first.id).unwrap();
        lifecycle::complete(&state, first.id).unwrap();

        let second = testutil::create_job(&state, JobKind::Ride, 0.0, 0.0);
        let assigned = match_job(&state, second.id).unwrap();
        assert_eq!(assigned.worker_id, Some(idle.id));
    }

    #[test]
    fn empty_pool_reports_no_worker_available() {
        let (state, _rx) = testutil::state();
        let job = testutil::create_job(&state, JobKind::Delivery, 0.0, 0.0);

        let err = match_job(&state, job.id).unwrap_err();
        assert!(matches!(err, DispatchError::NoWorkerAvailable));

        // job must be left untouched for a later retry
        let stored = state.jobs.get(job.id).unwrap();
        assert_eq!(stored.state, JobState::Requested);
        assert!(stored.worker_id.is_none());
    }

    #[test]
    fn workers_outside_radius_are_not_considered() {
        let (state, _rx) = testutil::state();
        // roughly 111 km away, far outside the 10 km default radius
        let _distant = testutil::register_worker(&state, 1.0, 0.0, 5.0);
        let job = testutil::create_job(&state, JobKind::Ride, 0.0, 0.0);

        let err = match_job(&state, job.id).unwrap_err();
        assert!(matches!(err, DispatchError::NoWorkerAvailable));
    }

    #[test]
    fn cancelled_job_cannot_be_matched() {
        let (state, _rx) = testutil::state();
        testutil::register_worker(&state, 0.0, 0.0, 4.5);
        let job = testutil::create_job(&state, JobKind::Ride, 0.0, 0.0);
        lifecycle::cancel(&state, job.id, "changed my mind".to_string()).unwrap();

        let err = match_job(&state, job.id).unwrap_err();
        assert!(matches!(err, DispatchError::IllegalTransition { .. }));

        // the candidate must not be left marked busy
        let worker = &state.workers.list()[0];
        assert!(worker.available);
        assert!(worker.current_job.is_none());
    }

    #[tokio::test]
    async fn concurrent_matches_never_double_book_one_worker() {
        let (state, _rx) = testutil::state();
        let state = Arc::new(state);
        testutil::register_worker(&state, 0.0, 0.0, 4.5);

        let jobs: Vec<_> = (0..8)
            .map(|_| testutil::create_job(&state, JobKind::Ride, 0.0, 0.0))
            .collect();

        let mut handles = Vec::new();
        for job in &jobs {
            let state = state.clone();
            let job_id = job.id;
            handles.push(tokio::spawn(async move { match_job(&state, job_id) }));
        }

        let mut successes = 0;
        let mut misses = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(DispatchError::NoWorkerAvailable) => misses += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(misses, 7);

        // invariant holds after the storm
        for worker in state.workers.list() {
            assert_eq!(worker.available, worker.current_job.is_none());
        }
    }
}
