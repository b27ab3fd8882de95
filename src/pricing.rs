use chrono::Duration;

use crate::config::PricingConfig;
use crate::models::job::JobKind;

/// Pricing policy consumed by the ledger. The engine never hard-codes
/// tariffs; a deployment supplies its own implementation or configures
/// [`StandardFarePolicy`] through the environment.
pub trait FarePolicy: Send + Sync {
    fn charge(&self, kind: JobKind, distance_km: f64, duration: Duration) -> f64;

    /// Worker share of a recorded charge.
    fn payout(&self, kind: JobKind, charge: f64) -> f64;
}

pub struct StandardFarePolicy {
    config: PricingConfig,
}

impl StandardFarePolicy {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }
}

impl FarePolicy for StandardFarePolicy {
    fn charge(&self, kind: JobKind, distance_km: f64, duration: Duration) -> f64 {
        let distance_km = distance_km.max(0.0);
        let minutes = (duration.num_seconds().max(0) as f64) / 60.0;

        let raw = match kind {
            JobKind::Ride => {
                self.config.base_fare
                    + distance_km * self.config.per_km_rate
                    + minutes * self.config.per_minute_rate
            }
            JobKind::Delivery => {
                self.config.delivery_base + distance_km * self.config.delivery_per_km_rate
            }
        };

        round_cents(raw)
    }

    fn payout(&self, kind: JobKind, charge: f64) -> f64 {
        match kind {
            JobKind::Ride => round_cents(charge * self.config.ride_commission),
            JobKind::Delivery => self.config.delivery_fee,
        }
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
