//! Chaos + telemetry relay.
//!
//! Accepts a JSON array of strings on `POST /process`, appends its own name,
//! optionally sleeps and fails on purpose, and relays the payload through a
//! chain of downstream instances while propagating W3C trace context.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                     CHAOS RELAY                      │
//!   POST /process │  ┌────────┐   ┌──────────────┐   ┌───────┐           │
//!  ───────────────┼─▶│  http  │──▶│ orchestrator │──▶│ chaos │           │
//!                 │  │ server │   │  (root span) │   │ gate  │           │
//!                 │  └────────┘   └──────┬───────┘   └───────┘           │
//!                 │                      ▼                               │
//!                 │               ┌─────────────┐  traceparent           │
//!   JSON response │               │    chain    │──────────────────────┼──▶ next relay
//!  ◀──────────────┼───────────────│ (hop spans) │◀─────────────────────┼─── (same API)
//!                 │               └─────────────┘                        │
//!                 │  ┌────────────────────────────────────────────────┐  │
//!                 │  │ observability: logs · OTel spans · Prometheus  │  │
//!                 │  └────────────────────────────────────────────────┘  │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use chaos_relay::config::load_config;
use chaos_relay::lifecycle::serve;
use chaos_relay::observability::logging::init_subscriber;
use chaos_relay::observability::metrics::install_recorder;
use chaos_relay::observability::TelemetryGuard;

#[derive(Parser)]
#[command(name = "chaos-relay")]
#[command(about = "Fault-injecting relay that emits correlated logs, metrics and traces", long_about = None)]
struct Cli {
    /// Optional TOML config file; environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind address (e.g. 0.0.0.0:8000).
    #[arg(short, long)]
    bind: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.service.bind_address = bind;
    }

    // The OTLP HTTP exporters own a blocking client; build them outside the runtime.
    let telemetry = TelemetryGuard::init(
        &config.service.name,
        &config.observability.otlp_endpoint,
        Duration::from_millis(config.observability.poll_interval_ms),
    )?;
    init_subscriber(
        &config.observability,
        telemetry.tracer_provider(),
        telemetry.logger_provider(),
    )?;

    tracing::info!(
        service = %config.service.name,
        bind_address = %config.service.bind_address,
        destinations = ?config.destinations,
        error_percent = config.faults.error_percent,
        max_latency_ms = config.faults.max_latency_ms,
        otlp_endpoint = %config.observability.otlp_endpoint,
        "Configuration loaded"
    );

    let metrics = install_recorder()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(serve(config, metrics, telemetry.meter()));
    drop(runtime);

    // Flushes pending spans, metrics and log records.
    drop(telemetry);

    result?;
    Ok(())
}
