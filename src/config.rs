use std::env;

use crate::error::DispatchError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub job_queue_size: usize,
    pub event_buffer_size: usize,
    pub match_radius_km: f64,
    pub match_limit: usize,
    pub pricing: PricingConfig,
}

/// Fare knobs come from the environment, not the engine: pricing is an
/// external policy the ledger consumes.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub base_fare: f64,
    pub per_km_rate: f64,
    pub per_minute_rate: f64,
    pub delivery_base: f64,
    pub delivery_per_km_rate: f64,
    pub ride_commission: f64,
    pub delivery_fee: f64,
}

impl Config {
    pub fn from_env() -> Result<Self, DispatchError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            job_queue_size: parse_or_default("JOB_QUEUE_SIZE", 1024)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            match_radius_km: parse_or_default("MATCH_RADIUS_KM", 10.0)?,
            match_limit: parse_or_default("MATCH_LIMIT", 5)?,
            pricing: PricingConfig {
                base_fare: parse_or_default("BASE_FARE", 2.50)?,
                per_km_rate: parse_or_default("PER_KM_RATE", 1.50)?,
                per_minute_rate: parse_or_default("PER_MINUTE_RATE", 0.25)?,
                delivery_base: parse_or_default("DELIVERY_BASE", 3.00)?,
                delivery_per_km_rate: parse_or_default("DELIVERY_PER_KM_RATE", 1.00)?,
                ride_commission: parse_or_default("RIDE_COMMISSION", 0.80)?,
                delivery_fee: parse_or_default("DELIVERY_FEE", 5.00)?,
            },
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, DispatchError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| DispatchError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
