//! Metrics collection and exposition.
//!
//! # Metrics
//! - `app_requests_total` (counter): requests by app, endpoint
//! - `app_active_requests` (gauge): sentinel value set per call site
//! - `app_response_time_seconds` (histogram): latency distribution by endpoint
//! - `app_random_value` (counter): random observation refreshed by the poller
//! - `app_memory_usage` (gauge): process memory in percent, refreshed by the poller
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; updates are atomic in the recorder
//! - The Prometheus recorder is installed once and rendered by `GET /metrics`
//! - Observable metrics are refreshed by a polling task, not by request handlers

use std::time::Duration;

use metrics::Unit;
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};
use rand::Rng;
use tokio::sync::broadcast;
use tokio::time;

use crate::observability::process::MemorySampler;

pub const REQUESTS_TOTAL: &str = "app_requests_total";
pub const ACTIVE_REQUESTS: &str = "app_active_requests";
pub const RESPONSE_TIME: &str = "app_response_time_seconds";
pub const RANDOM_VALUE: &str = "app_random_value";
pub const MEMORY_USAGE: &str = "app_memory_usage";

/// Histogram buckets in seconds, 5ms to 500ms.
pub const RESPONSE_TIME_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5];

/// Request-scoped metric instruments used by the handlers and the pipeline.
///
/// Implementations must tolerate concurrent calls from many requests.
pub trait Instruments: Send + Sync {
    /// Add `n` to the request counter for `endpoint`.
    fn add_requests(&self, n: u64, endpoint: &str);

    /// Overwrite the active-request gauge.
    fn set_active_requests(&self, value: f64);

    /// Record one response-time observation in seconds for `endpoint`.
    fn record_response_time(&self, seconds: f64, endpoint: &str);
}

/// [`Instruments`] backed by whichever `metrics` recorder is installed.
#[derive(Debug, Clone)]
pub struct PrometheusInstruments {
    app: String,
}

impl PrometheusInstruments {
    pub fn new(app: impl Into<String>) -> Self {
        Self { app: app.into() }
    }
}

impl Instruments for PrometheusInstruments {
    fn add_requests(&self, n: u64, endpoint: &str) {
        metrics::counter!(REQUESTS_TOTAL, "app" => self.app.clone(), "endpoint" => endpoint.to_string())
            .increment(n);
    }

    fn set_active_requests(&self, value: f64) {
        metrics::gauge!(ACTIVE_REQUESTS, "app" => self.app.clone()).set(value);
    }

    fn record_response_time(&self, seconds: f64, endpoint: &str) {
        metrics::histogram!(RESPONSE_TIME, "app" => self.app.clone(), "endpoint" => endpoint.to_string())
            .record(seconds);
    }
}

/// Register descriptions and units with the installed recorder.
pub fn describe_metrics() {
    metrics::describe_counter!(REQUESTS_TOTAL, Unit::Count, "Number of processed requests");
    metrics::describe_gauge!(ACTIVE_REQUESTS, Unit::Count, "Number of active requests");
    metrics::describe_histogram!(
        RESPONSE_TIME,
        Unit::Seconds,
        "Request response time in seconds"
    );
    metrics::describe_counter!(RANDOM_VALUE, "Random value observed by the poller");
    metrics::describe_gauge!(MEMORY_USAGE, Unit::Percent, "Process memory usage");
}

fn exporter_builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(RESPONSE_TIME.to_string()), RESPONSE_TIME_BUCKETS)
}

/// Install the Prometheus recorder as the global `metrics` recorder.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = exporter_builder()?.install_recorder()?;
    describe_metrics();
    tracing::info!("Prometheus recorder installed");
    Ok(handle)
}

/// Build a recorder without installing it, for scoped use.
pub fn build_recorder() -> Result<PrometheusRecorder, BuildError> {
    Ok(exporter_builder()?.build_recorder())
}

/// Periodic task that refreshes observable metrics and runs recorder upkeep.
pub struct ObservablePoller {
    app: String,
    interval: Duration,
    handle: Option<PrometheusHandle>,
    memory: MemorySampler,
}

impl ObservablePoller {
    pub fn new(app: impl Into<String>, interval: Duration, handle: Option<PrometheusHandle>) -> Self {
        Self {
            app: app.into(),
            interval,
            handle,
            memory: MemorySampler::new(),
        }
    }

    /// Take one observation of every observable metric.
    pub fn poll_once(&mut self) {
        let value = rand::thread_rng().gen_range(1..=100u64);
        metrics::counter!(RANDOM_VALUE, "service" => self.app.clone()).absolute(value);

        let memory = self.memory.memory_percent();
        metrics::gauge!(MEMORY_USAGE, "service" => self.app.clone()).set(memory);

        if let Some(handle) = &self.handle {
            handle.run_upkeep();
        }
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            "Observable metrics poller starting"
        );

        let mut ticker = time::interval(self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Observable metrics poller received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
