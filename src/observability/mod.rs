//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! main (startup):
//!     → otel.rs (tracer, meter and logger providers, OTLP/HTTP export, flush guard)
//!     → logging.rs (span layer, fmt layer, OTel log bridge; one filter each)
//!     → metrics.rs (Prometheus recorder, observable metrics poller)
//!     → meter.rs (OTLP instruments and observable callbacks)
//!
//! Per request:
//!     → propagation.rs (traceparent in/out)
//!     → correlation.rs (LogContext attached to every log line)
//!     → FanoutInstruments (Prometheus + OTLP: counter, gauge, histogram)
//!
//! Poll/collect:
//!     → process.rs (process memory percent)
//! ```
//!
//! # Design Decisions
//! - Spans are `tracing` spans; the OTel layer assigns trace and span ids
//! - Providers are built once in `main` and handed down, never looked up globally
//! - Metric instruments are reached through the `Instruments` trait so tests can record them

pub mod correlation;
pub mod logging;
pub mod meter;
pub mod metrics;
pub mod otel;
pub mod process;
pub mod propagation;

pub(crate) use correlation::correlated;
pub use correlation::{current_log_context, LogContext};
pub use meter::{FanoutInstruments, OtlpInstruments, OtlpObservables};
pub use metrics::{Instruments, PrometheusInstruments};
pub use otel::{TelemetryError, TelemetryGuard};
