//! OpenTelemetry instruments pushed to the collector over OTLP.
//!
//! Mirrors the Prometheus instruments in `metrics.rs` under the same names, so
//! both backends see the same series.

use std::sync::{Arc, Mutex};

use opentelemetry::metrics::{
    Counter, Gauge, Histogram, Meter, ObservableCounter, ObservableGauge,
};
use opentelemetry::KeyValue;
use rand::Rng;

use crate::observability::metrics::{
    Instruments, ACTIVE_REQUESTS, MEMORY_USAGE, RANDOM_VALUE, REQUESTS_TOTAL, RESPONSE_TIME,
    RESPONSE_TIME_BUCKETS,
};
use crate::observability::process::MemorySampler;

/// [`Instruments`] backed by an OpenTelemetry [`Meter`].
pub struct OtlpInstruments {
    app: String,
    requests: Counter<u64>,
    active: Gauge<f64>,
    response_time: Histogram<f64>,
}

impl OtlpInstruments {
    pub fn new(meter: &Meter, app: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            requests: meter
                .u64_counter(REQUESTS_TOTAL)
                .with_description("Number of processed requests")
                .with_unit("1")
                .build(),
            active: meter
                .f64_gauge(ACTIVE_REQUESTS)
                .with_description("Number of active requests")
                .with_unit("1")
                .build(),
            response_time: meter
                .f64_histogram(RESPONSE_TIME)
                .with_description("Request response time in seconds")
                .with_unit("s")
                .with_boundaries(RESPONSE_TIME_BUCKETS.to_vec())
                .build(),
        }
    }

    fn labels(&self, endpoint: &str) -> [KeyValue; 2] {
        [
            KeyValue::new("app", self.app.clone()),
            KeyValue::new("endpoint", endpoint.to_string()),
        ]
    }
}

impl Instruments for OtlpInstruments {
    fn add_requests(&self, n: u64, endpoint: &str) {
        self.requests.add(n, &self.labels(endpoint));
    }

    fn set_active_requests(&self, value: f64) {
        self.active
            .record(value, &[KeyValue::new("app", self.app.clone())]);
    }

    fn record_response_time(&self, seconds: f64, endpoint: &str) {
        self.response_time.record(seconds, &self.labels(endpoint));
    }
}

/// Callback-driven instruments, observed on every metric collection.
///
/// Keep the value alive for as long as the observations should be reported.
pub struct OtlpObservables {
    _random: ObservableCounter<u64>,
    _memory: ObservableGauge<f64>,
}

impl OtlpObservables {
    pub fn register(meter: &Meter, app: impl Into<String>) -> Self {
        let service = KeyValue::new("service", app.into());

        let random_attrs = [service.clone()];
        let random = meter
            .u64_observable_counter(RANDOM_VALUE)
            .with_description("Random value observed on collection")
            .with_callback(move |observer| {
                let value = rand::thread_rng().gen_range(1..=100u64);
                observer.observe(value, &random_attrs);
            })
            .build();

        let sampler = Mutex::new(MemorySampler::new());
        let memory_attrs = [service];
        let memory = meter
            .f64_observable_gauge(MEMORY_USAGE)
            .with_description("Process memory usage")
            .with_unit("%")
            .with_callback(move |observer| {
                if let Ok(mut sampler) = sampler.lock() {
                    observer.observe(sampler.memory_percent(), &memory_attrs);
                }
            })
            .build();

        Self {
            _random: random,
            _memory: memory,
        }
    }
}

/// Forwards every call to each of its sinks.
pub struct FanoutInstruments {
    sinks: Vec<Arc<dyn Instruments>>,
}

impl FanoutInstruments {
    pub fn new(sinks: Vec<Arc<dyn Instruments>>) -> Self {
        Self { sinks }
    }
}

impl Instruments for FanoutInstruments {
    fn add_requests(&self, n: u64, endpoint: &str) {
        for sink in &self.sinks {
            sink.add_requests(n, endpoint);
        }
    }

    fn set_active_requests(&self, value: f64) {
        for sink in &self.sinks {
            sink.set_active_requests(value);
        }
    }

    fn record_response_time(&self, seconds: f64, endpoint: &str) {
        for sink in &self.sinks {
            sink.record_response_time(seconds, endpoint);
        }
    }
}
