//! Structured logging.
//!
//! One subscriber carries three layers, each with its own filter:
//! - `tracing-opentelemetry` turns this crate's spans into OTel spans. Its
//!   filter is fixed, so the log level never disables tracing or propagation.
//! - `fmt` writes JSON or human-readable lines, filtered by `RUST_LOG` or the
//!   configured level.
//! - the OTel log bridge ships the same events to the logger provider.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing::Level;
use tracing_subscriber::filter::{Directive, Targets};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{LogFormat, ObservabilityConfig};
use crate::observability::otel::{TelemetryError, INSTRUMENTATION_SCOPE};

/// Targets whose events would loop back into the log exporter.
const EXPORTER_TARGETS: &[&str] = &["hyper", "h2", "reqwest", "opentelemetry"];

/// Filter directives used when `RUST_LOG` is not set.
pub fn default_directives(level: &str) -> String {
    format!("chaos_relay={level},tower_http={level}")
}

/// Filter of the span layer: every span and event of this crate at INFO and above.
pub fn trace_filter() -> Targets {
    Targets::new().with_target("chaos_relay", Level::INFO)
}

fn log_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

fn bridge_filter(level: &str) -> EnvFilter {
    EXPORTER_TARGETS
        .iter()
        .filter_map(|target| format!("{target}=off").parse::<Directive>().ok())
        .fold(log_filter(level), EnvFilter::add_directive)
}

/// Install the global subscriber.
pub fn init_subscriber(
    config: &ObservabilityConfig,
    tracer_provider: &SdkTracerProvider,
    logger_provider: &SdkLoggerProvider,
) -> Result<(), TelemetryError> {
    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };

    let otel_layer =
        tracing_opentelemetry::layer().with_tracer(tracer_provider.tracer(INSTRUMENTATION_SCOPE));
    let bridge_layer = OpenTelemetryTracingBridge::new(logger_provider);

    tracing_subscriber::registry()
        .with(otel_layer.with_filter(trace_filter()))
        .with(fmt_layer.with_filter(log_filter(&config.log_level)))
        .with(bridge_layer.with_filter(bridge_filter(&config.log_level)))
        .try_init()?;

    Ok(())
}
