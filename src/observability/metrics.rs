use prometheus::{
    Encoder, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub dispatch_total: IntCounterVec,
    pub jobs_in_queue: IntGauge,
    pub match_latency_seconds: HistogramVec,
    pub jobs_terminal_total: IntCounterVec,
    pub workers_available: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let dispatch_total = IntCounterVec::new(
            Opts::new("dispatch_total", "Dispatch attempts by outcome"),
            &["outcome"],
        )
        .expect("valid dispatch_total metric");

        let jobs_in_queue = IntGauge::new(
            "jobs_in_queue",
            "Current number of jobs waiting for dispatch",
        )
        .expect("valid jobs_in_queue metric");

        let match_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "match_latency_seconds",
                "Latency of match processing in seconds",
            ),
            &["outcome"],
        )
        .expect("valid match_latency_seconds metric");

        let jobs_terminal_total = IntCounterVec::new(
            Opts::new("jobs_terminal_total", "Jobs reaching a terminal state"),
            &["state"],
        )
        .expect("valid jobs_terminal_total metric");

        let workers_available = IntGauge::new(
            "workers_available",
            "Workers currently available for assignment",
        )
        .expect("valid workers_available metric");

        registry
            .register(Box::new(dispatch_total.clone()))
            .expect("register dispatch_total");
        registry
            .register(Box::new(jobs_in_queue.clone()))
            .expect("register jobs_in_queue");
        registry
            .register(Box::new(match_latency_seconds.clone()))
            .expect("register match_latency_seconds");
        registry
            .register(Box::new(jobs_terminal_total.clone()))
            .expect("register jobs_terminal_total");
        registry
            .register(Box::new(workers_available.clone()))
            .expect("register workers_available");

        Self {
            registry,
            dispatch_total,
            jobs_in_queue,
            match_latency_seconds,
            jobs_terminal_total,
            workers_available,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
