use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::worker::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobKind {
    Ride,
    Delivery,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobState {
    Requested,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Cancelled)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobState::Requested => "requested",
            JobState::Assigned => "assigned",
            JobState::InProgress => "in_progress",
            JobState::Completed => "completed",
            JobState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// One ride or delivery request tracked through its lifecycle.
///
/// Invariant: `worker_id` is set iff state is Assigned, InProgress or
/// Completed. Created by intake in `Requested`; mutated only through the
/// lifecycle tracker; archived (never deleted) once terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub kind: JobKind,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub requested_at: DateTime<Utc>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub state: JobState,
    pub worker_id: Option<Uuid>,
    pub charge: Option<f64>,
    pub cancel_reason: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub version: u64,
}
