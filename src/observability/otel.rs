//! OpenTelemetry providers and OTLP export.
//!
//! Traces, metrics and logs share one resource and one collector base URL.
//! Each signal posts to its own sub-path: `/v1/traces`, `/v1/metrics`, `/v1/logs`.

use std::time::Duration;

use opentelemetry::metrics::{Meter, MeterProvider as _};
use opentelemetry::KeyValue;
use opentelemetry_otlp::{LogExporter, MetricExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use thiserror::Error;

/// Instrumentation scope name of every span, instrument and log record.
pub const INSTRUMENTATION_SCOPE: &str = "chaos-relay";

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to build OTLP exporter: {0}")]
    Exporter(#[from] opentelemetry_otlp::ExporterBuildError),

    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

fn resource(service_name: &str) -> Resource {
    Resource::builder()
        .with_service_name(service_name.to_string())
        .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
        .build()
}

fn signal_endpoint(otlp_endpoint: &str, signal: &str) -> String {
    format!("{}/v1/{}", otlp_endpoint.trim_end_matches('/'), signal)
}

/// Build the tracer provider for `service_name`.
///
/// With an empty `otlp_endpoint` spans are still created, so trace and span
/// ids exist for log correlation and propagation, but nothing is exported.
/// Otherwise a batch OTLP/HTTP exporter posts to `<otlp_endpoint>/v1/traces`.
///
/// The HTTP exporters use a blocking client, so call the builders in this
/// module before entering the Tokio runtime.
pub fn build_tracer_provider(
    service_name: &str,
    otlp_endpoint: &str,
) -> Result<SdkTracerProvider, TelemetryError> {
    let mut builder = SdkTracerProvider::builder().with_resource(resource(service_name));

    if !otlp_endpoint.is_empty() {
        let exporter = SpanExporter::builder()
            .with_http()
            .with_endpoint(signal_endpoint(otlp_endpoint, "traces"))
            .build()?;
        builder = builder.with_batch_exporter(exporter);
    }

    Ok(builder.build())
}

/// Build the meter provider. With an endpoint, a periodic reader pushes to
/// `<otlp_endpoint>/v1/metrics` every `interval`.
pub fn build_meter_provider(
    service_name: &str,
    otlp_endpoint: &str,
    interval: Duration,
) -> Result<SdkMeterProvider, TelemetryError> {
    let mut builder = SdkMeterProvider::builder().with_resource(resource(service_name));

    if !otlp_endpoint.is_empty() {
        let exporter = MetricExporter::builder()
            .with_http()
            .with_endpoint(signal_endpoint(otlp_endpoint, "metrics"))
            .build()?;
        let reader = PeriodicReader::builder(exporter)
            .with_interval(interval)
            .build();
        builder = builder.with_reader(reader);
    }

    Ok(builder.build())
}

/// Build the logger provider fed by the `tracing` bridge. With an endpoint,
/// records are batched to `<otlp_endpoint>/v1/logs`.
pub fn build_logger_provider(
    service_name: &str,
    otlp_endpoint: &str,
) -> Result<SdkLoggerProvider, TelemetryError> {
    let mut builder = SdkLoggerProvider::builder().with_resource(resource(service_name));

    if !otlp_endpoint.is_empty() {
        let exporter = LogExporter::builder()
            .with_http()
            .with_endpoint(signal_endpoint(otlp_endpoint, "logs"))
            .build()?;
        builder = builder.with_batch_exporter(exporter);
    }

    Ok(builder.build())
}

/// Owns every provider and shuts them down on drop, flushing pending data.
pub struct TelemetryGuard {
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
    logger_provider: SdkLoggerProvider,
}

impl TelemetryGuard {
    pub fn new(
        tracer_provider: SdkTracerProvider,
        meter_provider: SdkMeterProvider,
        logger_provider: SdkLoggerProvider,
    ) -> Self {
        Self {
            tracer_provider,
            meter_provider,
            logger_provider,
        }
    }

    /// Build all three providers for one service and collector.
    pub fn init(
        service_name: &str,
        otlp_endpoint: &str,
        metrics_interval: Duration,
    ) -> Result<Self, TelemetryError> {
        Ok(Self::new(
            build_tracer_provider(service_name, otlp_endpoint)?,
            build_meter_provider(service_name, otlp_endpoint, metrics_interval)?,
            build_logger_provider(service_name, otlp_endpoint)?,
        ))
    }

    pub fn tracer_provider(&self) -> &SdkTracerProvider {
        &self.tracer_provider
    }

    pub fn logger_provider(&self) -> &SdkLoggerProvider {
        &self.logger_provider
    }

    pub fn meter(&self) -> Meter {
        self.meter_provider.meter(INSTRUMENTATION_SCOPE)
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Err(e) = self.tracer_provider.shutdown() {
            eprintln!("OTel tracer shutdown error: {e}");
        }
        if let Err(e) = self.meter_provider.shutdown() {
            eprintln!("OTel meter shutdown error: {e}");
        }
        if let Err(e) = self.logger_provider.shutdown() {
            eprintln!("OTel logger shutdown error: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_endpoints() {
        assert_eq!(
            signal_endpoint("http://otel-collector:4318", "traces"),
            "http://otel-collector:4318/v1/traces"
        );
        assert_eq!(
            signal_endpoint("http://otel-collector:4318/", "logs"),
            "http://otel-collector:4318/v1/logs"
        );
    }

    #[test]
    fn test_providers_without_endpoint_export_nothing() {
        let guard = TelemetryGuard::init("app-a", "", Duration::from_secs(1)).unwrap();
        let _ = guard.meter();
        drop(guard);
    }
}
