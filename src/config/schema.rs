//! Configuration schema definitions.
//!
//! All types derive Serde traits so a TOML file can provide any subset of
//! the fields; everything else falls back to the defaults below.

use serde::{Deserialize, Serialize};

/// Root configuration for the relay service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service identity and listener.
    pub service: ServiceSection,

    /// Ordered downstream base URLs. Empty disables propagation.
    pub destinations: Vec<String>,

    /// Simulated latency and failure.
    pub faults: FaultConfig,

    /// Logging, tracing export and metric polling.
    pub observability: ObservabilityConfig,
}

/// Service identity and listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceSection {
    /// Name appended to every relayed payload and used as `service.name`.
    pub name: String,

    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            name: "app-observability-otel".to_string(),
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Fault injection parameters, fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FaultConfig {
    /// Percentage of requests that fail with a simulated error (0 to 100).
    pub error_percent: u8,

    /// Upper bound of the injected delay in milliseconds. 0 disables it.
    pub max_latency_ms: u64,
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Collector base URL; traces go to `<endpoint>/v1/traces`. Empty disables export.
    pub otlp_endpoint: String,

    /// Interval of the observable metrics poller in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            otlp_endpoint: String::new(),
            poll_interval_ms: 1000,
        }
    }
}

/// Split a comma-separated destination list.
///
/// Entries are trimmed, empty entries dropped and a trailing `/` removed so
/// that `<destination>/process` is always well formed.
pub fn parse_destinations(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| d.trim_end_matches('/').to_string())
        .collect()
}
