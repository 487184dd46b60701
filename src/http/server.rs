//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (request ID, HTTP tracing)
//! - Build the shared request pipeline and inject telemetry handles
//! - Serve on a listener until the shutdown signal fires

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::http::handlers;
use crate::http::request::request_id_layers;
use crate::observability::Instruments;
use crate::pipeline::RequestOrchestrator;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<RequestOrchestrator>,
    pub instruments: Arc<dyn Instruments>,
    pub metrics: PrometheusHandle,
    pub service_name: Arc<str>,
}

/// HTTP server for the relay service.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
}

impl HttpServer {
    /// Create a new HTTP server with a default outbound client.
    pub fn new(
        config: ServiceConfig,
        instruments: Arc<dyn Instruments>,
        metrics: PrometheusHandle,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(config, client, instruments, metrics))
    }

    /// Create a new HTTP server that forwards through `client`.
    pub fn with_client(
        config: ServiceConfig,
        client: reqwest::Client,
        instruments: Arc<dyn Instruments>,
        metrics: PrometheusHandle,
    ) -> Self {
        let orchestrator = Arc::new(RequestOrchestrator::from_config(
            &config,
            client,
            instruments.clone(),
        ));

        let state = AppState {
            orchestrator,
            instruments,
            metrics,
            service_name: Arc::from(config.service.name.as_str()),
        };

        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let (set_request_id, propagate_request_id) = request_id_layers();

        Router::new()
            .route("/", get(handlers::root))
            .route("/metrics", get(handlers::metrics))
            .route("/process", post(handlers::process))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(propagate_request_id)
            .layer(set_request_id)
    }

    /// A clone of the router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            service = %self.config.service.name,
            destinations = ?self.config.destinations,
            error_percent = self.config.faults.error_percent,
            max_latency_ms = self.config.faults.max_latency_ms,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}
