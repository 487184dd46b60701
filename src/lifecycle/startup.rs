//! Startup orchestration.
//!
//! Runs inside the Tokio runtime once configuration, logging, the telemetry
//! providers and the metrics recorder are in place. Any startup error is fatal.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;
use opentelemetry::metrics::Meter;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::ServiceConfig;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::wait_for_signal;
use crate::observability::metrics::ObservablePoller;
use crate::observability::{
    FanoutInstruments, Instruments, OtlpInstruments, OtlpObservables, PrometheusInstruments,
};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Bind, serve until SIGINT/SIGTERM or a server failure, then drain and stop
/// background tasks.
pub async fn serve(
    config: ServiceConfig,
    metrics: PrometheusHandle,
    meter: Meter,
) -> Result<(), StartupError> {
    let listener = TcpListener::bind(&config.service.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.service.bind_address.clone(),
            source,
        })?;

    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let name = config.service.name.clone();

    let poller = ObservablePoller::new(
        name.clone(),
        Duration::from_millis(config.observability.poll_interval_ms),
        Some(metrics.clone()),
    );
    let poller_task = tokio::spawn(poller.run(shutdown.subscribe()));
    let _observables = OtlpObservables::register(&meter, name.clone());

    let sinks: Vec<Arc<dyn Instruments>> = vec![
        Arc::new(PrometheusInstruments::new(name.clone())),
        Arc::new(OtlpInstruments::new(&meter, name)),
    ];
    let instruments = Arc::new(FanoutInstruments::new(sinks));

    let server = HttpServer::new(config, instruments, metrics)?;
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    supervise(server_task, poller_task, &shutdown, wait_for_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for `signal` or for the server to exit on its own, whichever comes
/// first, then shut everything down. A server that stops early ends this
/// with its own result.
pub async fn supervise<F>(
    mut server_task: JoinHandle<std::io::Result<()>>,
    poller_task: JoinHandle<()>,
    shutdown: &Shutdown,
    signal: F,
) -> Result<(), StartupError>
where
    F: Future<Output = ()>,
{
    let early_exit = tokio::select! {
        _ = signal => None,
        result = &mut server_task => Some(result),
    };

    shutdown.trigger();

    let server_result = match early_exit {
        Some(result) => {
            tracing::error!("HTTP server stopped before a shutdown signal");
            result
        }
        None => server_task.await,
    };

    poller_task.await?;
    server_result??;
    Ok(())
}
