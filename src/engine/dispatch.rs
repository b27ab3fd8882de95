use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::matcher;
use crate::engine::queue::enqueue_job;
use crate::error::DispatchError;
use crate::state::AppState;

const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Background consumer of the job queue. The matcher itself never retries;
/// this loop owns the retry policy and re-enqueues a job after a short
/// backoff when no worker was available.
pub async fn run_dispatch_loop(state: Arc<AppState>, mut job_rx: mpsc::Receiver<Uuid>) {
    info!("dispatch loop started");

    while let Some(job_id) = job_rx.recv().await {
        state.metrics.jobs_in_queue.dec();

        let start = Instant::now();
        let outcome = match matcher::match_job(&state, job_id) {
            Ok(job) => {
                info!(job_id = %job.id, worker_id = ?job.worker_id, "job assigned");
                "matched"
            }
            Err(DispatchError::NoWorkerAvailable) => {
                // expected outcome, not an error; park the job and retry
                info!(job_id = %job_id, "no worker available; re-queueing");
                sleep(RETRY_BACKOFF).await;
                if let Err(err) = enqueue_job(&state, job_id).await {
                    error!(job_id = %job_id, error = %err, "failed to re-queue job");
                }
                "no_worker"
            }
            Err(err) => {
                error!(job_id = %job_id, error = %err, "failed to dispatch job");
                "error"
            }
        };

        let elapsed = start.elapsed().as_secs_f64();
        state
            .metrics
            .match_latency_seconds
            .with_label_values(&[outcome])
            .observe(elapsed);
        state
            .metrics
            .dispatch_total
            .with_label_values(&[outcome])
            .inc();
    }

    warn!("dispatch loop stopped: queue channel closed");
}
