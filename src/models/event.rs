use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::JobState;

/// Lifecycle notification emitted on every job transition. Consumed by the
/// websocket feed; delivery guarantees belong to the external notifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    pub job_id: Uuid,
    pub worker_id: Option<Uuid>,
    pub state: JobState,
    pub at: DateTime<Utc>,
}
