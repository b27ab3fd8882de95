use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A driver capable of fulfilling one job at a time.
///
/// Invariant: `available` is false whenever `current_job` is set. The pool
/// and the lifecycle tracker are the only writers, and both go through the
/// store's compare-and-swap, so `version` advances on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: Uuid,
    pub name: String,
    pub location: GeoPoint,
    pub location_updated_at: DateTime<Utc>,
    pub available: bool,
    pub current_job: Option<Uuid>,
    pub completed_jobs: u64,
    pub rating: f64,
    pub version: u64,
}

impl Worker {
    pub fn new(id: Uuid, name: String, location: GeoPoint, rating: f64) -> Self {
        Self {
            id,
            name,
            location,
            location_updated_at: Utc::now(),
            available: true,
            current_job: None,
            completed_jobs: 0,
            rating: rating.clamp(0.0, 5.0),
            version: 0,
        }
    }
}
