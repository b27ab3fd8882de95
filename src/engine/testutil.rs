use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::{Config, PricingConfig};
use crate::engine::intake::{self, JobRequest};
use crate::engine::pool;
use crate::models::job::{Job, JobKind};
use crate::models::worker::{GeoPoint, Worker};
use crate::pricing::StandardFarePolicy;
use crate::state::AppState;
use crate::store::memory::MemoryStore;

pub fn config() -> Config {
    Config {
        http_port: 0,
        log_level: "info".to_string(),
        job_queue_size: 64,
        event_buffer_size: 64,
        match_radius_km: 10.0,
        match_limit: 5,
        pricing: PricingConfig {
            base_fare: 2.50,
            per_km_rate: 1.50,
            per_minute_rate: 0.25,
            delivery_base: 3.00,
            delivery_per_km_rate: 1.00,
            ride_commission: 0.80,
            delivery_fee: 5.00,
        },
    }
}

pub fn state() -> (AppState, mpsc::Receiver<Uuid>) {
    AppState::new(&config())
}

pub fn state_with_ledger(
    ledger: Arc<dyn crate::store::LedgerStore>,
) -> (AppState, mpsc::Receiver<Uuid>) {
    let cfg = config();
    let store = Arc::new(MemoryStore::new());
    let fares = Arc::new(StandardFarePolicy::new(cfg.pricing.clone()));
    AppState::with_stores(&cfg, store.clone(), store, ledger, fares)
}

pub fn register_worker(state: &AppState, lat: f64, lng: f64, rating: f64) -> Worker {
    pool::register(
        state,
        Uuid::new_v4(),
        "test-worker".to_string(),
        GeoPoint { lat, lng },
        rating,
    )
    .expect("register worker")
}

pub fn create_job(state: &AppState, kind: JobKind, lat: f64, lng: f64) -> Job {
    intake::create_job(
        state,
        JobRequest {
            kind,
            requester_id: Uuid::new_v4(),
            pickup: GeoPoint { lat, lng },
            dropoff: GeoPoint {
                lat: lat + 0.05,
                lng: lng + 0.05,
            },
            scheduled_at: None,
        },
    )
    .expect("create job")
}
