use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::job::Job;
use crate::models::ledger::LedgerEntry;
use crate::models::worker::Worker;
use crate::store::{JobStore, LedgerStore, StoreError, WorkerStore};

/// In-memory store backing all three contracts. DashMap entry locks make
/// each compare-and-swap atomic per record; nothing here ever holds two
/// entry locks at once.
#[derive(Default)]
pub struct MemoryStore {
    jobs: DashMap<Uuid, Job>,
    workers: DashMap<Uuid, Worker>,
    ledger: DashMap<Uuid, LedgerEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for MemoryStore {
    fn insert(&self, job: Job) -> Result<(), StoreError> {
        match self.jobs.entry(job.id) {
            Entry::Occupied(occupied) => Err(StoreError::Duplicate(*occupied.key())),
            Entry::Vacant(vacant) => {
                vacant.insert(job);
                Ok(())
            }
        }
    }

    fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.get(&id).map(|entry| entry.value().clone())
    }

    fn list(&self) -> Vec<Job> {
        self.jobs.iter().map(|entry| entry.value().clone()).collect()
    }

    fn update(&self, expected_version: u64, mut job: Job) -> Result<Job, StoreError> {
        let mut entry = self
            .jobs
            .get_mut(&job.id)
            .ok_or(StoreError::NotFound(job.id))?;

        if entry.version != expected_version {
            return Err(StoreError::VersionConflict(job.id));
        }

        job.version = expected_version + 1;
        *entry.value_mut() = job.clone();
        Ok(job)
    }
}

impl WorkerStore for MemoryStore {
    fn insert(&self, worker: Worker) -> Result<(), StoreError> {
        match self.workers.entry(worker.id) {
            Entry::Occupied(occupied) => Err(StoreError::Duplicate(*occupied.key())),
            Entry::Vacant(vacant) => {
                vacant.insert(worker);
                Ok(())
            }
        }
    }

    fn get(&self, id: Uuid) -> Option<Worker> {
        self.workers.get(&id).map(|entry| entry.value().clone())
    }

    fn list(&self) -> Vec<Worker> {
        self.workers
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn update(&self, expected_version: u64, mut worker: Worker) -> Result<Worker, StoreError> {
        let mut entry = self
            .workers
            .get_mut(&worker.id)
            .ok_or(StoreError::NotFound(worker.id))?;

        if entry.version != expected_version {
            return Err(StoreError::VersionConflict(worker.id));
        }

        worker.version = expected_version + 1;
        *entry.value_mut() = worker.clone();
        Ok(worker)
    }
}

impl LedgerStore for MemoryStore {
    fn insert(&self, entry: LedgerEntry) -> Result<LedgerEntry, StoreError> {
        match self.ledger.entry(entry.job_id) {
            Entry::Occupied(occupied) => Ok(occupied.get().clone()),
            Entry::Vacant(vacant) => {
                vacant.insert(entry.clone());
                Ok(entry)
            }
        }
    }

    fn get(&self, job_id: Uuid) -> Option<LedgerEntry> {
        self.ledger.get(&job_id).map(|entry| entry.value().clone())
    }

    fn list(&self) -> Vec<LedgerEntry> {
        self.ledger
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}
