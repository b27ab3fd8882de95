use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::config::Config;
use crate::models::event::JobEvent;
use crate::observability::metrics::Metrics;
use crate::pricing::{FarePolicy, StandardFarePolicy};
use crate::store::memory::MemoryStore;
use crate::store::{JobStore, LedgerStore, WorkerStore};

/// Shared service state. Stores and the fare policy are abstract
/// collaborators injected at construction; nothing in the crate reaches for
/// a global handle.
pub struct AppState {
    pub jobs: Arc<dyn JobStore>,
    pub workers: Arc<dyn WorkerStore>,
    pub ledger: Arc<dyn LedgerStore>,
    pub fares: Arc<dyn FarePolicy>,
    pub job_tx: mpsc::Sender<Uuid>,
    pub job_events_tx: broadcast::Sender<JobEvent>,
    pub metrics: Metrics,
    pub match_radius_km: f64,
    pub match_limit: usize,
}

impl AppState {
    pub fn new(config: &Config) -> (Self, mpsc::Receiver<Uuid>) {
        let store = Arc::new(MemoryStore::new());
        let fares = Arc::new(StandardFarePolicy::new(config.pricing.clone()));
        Self::with_stores(config, store.clone(), store.clone(), store, fares)
    }

    pub fn with_stores(
        config: &Config,
        jobs: Arc<dyn JobStore>,
        workers: Arc<dyn WorkerStore>,
        ledger: Arc<dyn LedgerStore>,
        fares: Arc<dyn FarePolicy>,
    ) -> (Self, mpsc::Receiver<Uuid>) {
        let (job_tx, job_rx) = mpsc::channel(config.job_queue_size);
        let (job_events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);

        (
            Self {
                jobs,
                workers,
                ledger,
                fares,
                job_tx,
                job_events_tx,
                metrics: Metrics::new(),
                match_radius_km: config.match_radius_km,
                match_limit: config.match_limit,
            },
            job_rx,
        )
    }

    /// Best-effort lifecycle notification; dropped if nobody listens.
    pub fn emit(&self, event: JobEvent) {
        let _ = self.job_events_tx.send(event);
    }
}
