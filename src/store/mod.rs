pub mod memory;

use thiserror::Error;
use uuid::Uuid;

use crate::models::job::Job;
use crate::models::ledger::LedgerEntry;
use crate::models::worker::Worker;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("record {0} already exists")]
    Duplicate(Uuid),

    #[error("record {0} not found")]
    NotFound(Uuid),

    /// The stored version no longer matches the caller's snapshot. Somebody
    /// else won the race; re-read and decide again.
    #[error("version conflict on record {0}")]
    VersionConflict(Uuid),

    #[error("store backend failed: {0}")]
    Backend(String),
}

/// Storage contract for jobs. `update` is a compare-and-swap: the write
/// lands only if the stored version still equals `expected_version`, and the
/// stored record's version becomes `expected_version + 1`.
pub trait JobStore: Send + Sync {
    fn insert(&self, job: Job) -> Result<(), StoreError>;
    fn get(&self, id: Uuid) -> Option<Job>;
    fn list(&self) -> Vec<Job>;
    fn update(&self, expected_version: u64, job: Job) -> Result<Job, StoreError>;
}

/// Storage contract for workers, same compare-and-swap discipline as
/// [`JobStore`].
pub trait WorkerStore: Send + Sync {
    fn insert(&self, worker: Worker) -> Result<(), StoreError>;
    fn get(&self, id: Uuid) -> Option<Worker>;
    fn list(&self) -> Vec<Worker>;
    fn update(&self, expected_version: u64, worker: Worker) -> Result<Worker, StoreError>;
}

/// Append-only charge records. `insert` is idempotent on `job_id`: a second
/// insert for the same job returns the entry already recorded, unchanged.
pub trait LedgerStore: Send + Sync {
    fn insert(&self, entry: LedgerEntry) -> Result<LedgerEntry, StoreError>;
    fn get(&self, job_id: Uuid) -> Option<LedgerEntry>;
    fn list(&self) -> Vec<LedgerEntry>;
}
