use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::JobKind;

/// Durable record of the charge for a terminal job. Keyed by `job_id`;
/// at most one entry ever exists per job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub job_id: Uuid,
    pub worker_id: Uuid,
    pub kind: JobKind,
    pub charge: f64,
    pub worker_payout: f64,
    pub recorded_at: DateTime<Utc>,
}
