//! End-to-end handling of one `/process` request.
//!
//! ```text
//! Received → FaultGate ─┬─ simulated error ────────────────→ Failed
//!                       ├─ destinations → Propagating ─┬──→ Succeeded
//!                       │                              └──→ Failed
//!                       └─ no destinations ────────────────→ Succeeded
//! ```

use std::sync::Arc;
use std::time::Instant;

use axum::http::HeaderMap;
use opentelemetry::trace::TraceContextExt;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use tracing::{field, Instrument, Span};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::chaos::FaultInjector;
use crate::config::ServiceConfig;
use crate::observability::propagation::extract_context;
use crate::observability::{correlated, current_log_context, Instruments, LogContext};
use crate::pipeline::chain::PropagationChain;
use crate::pipeline::error::ProcessError;

pub const PROCESS_ENDPOINT: &str = "/process";
pub const PROCESS_OPERATION: &str = "process_request";

/// Value the active-request gauge is set to on every `/process` call.
pub const ACTIVE_REQUESTS_SENTINEL: f64 = 10.0;

/// Runs the fault gate and the propagation chain for inbound payloads.
pub struct RequestOrchestrator {
    service_name: String,
    destinations: Arc<[String]>,
    faults: FaultInjector,
    chain: PropagationChain,
    propagator: TraceContextPropagator,
    instruments: Arc<dyn Instruments>,
}

impl RequestOrchestrator {
    pub fn new(
        service_name: impl Into<String>,
        destinations: Vec<String>,
        faults: FaultInjector,
        chain: PropagationChain,
        instruments: Arc<dyn Instruments>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            destinations: destinations.into(),
            faults,
            chain,
            propagator: TraceContextPropagator::new(),
            instruments,
        }
    }

    pub fn from_config(
        config: &ServiceConfig,
        client: reqwest::Client,
        instruments: Arc<dyn Instruments>,
    ) -> Self {
        Self::new(
            config.service.name.clone(),
            config.destinations.clone(),
            FaultInjector::new(config.faults),
            PropagationChain::new(client),
            instruments,
        )
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn destinations(&self) -> &[String] {
        &self.destinations
    }

    /// Process one payload under a root span parented on the caller's
    /// `traceparent`, when one is present and valid.
    pub async fn process(
        &self,
        payload: Vec<String>,
        headers: &HeaderMap,
    ) -> Result<Vec<String>, ProcessError> {
        let root = tracing::info_span!(
            "process-request",
            http.route = PROCESS_ENDPOINT,
            http.request.method = "POST",
            app.name = %self.service_name,
            payload.original = ?payload,
            payload.modified = field::Empty,
            otel.status_code = field::Empty,
            otel.status_message = field::Empty,
        );

        let parent = extract_context(&self.propagator, headers);
        if parent.span().span_context().is_valid() {
            root.set_parent(parent);
        }

        self.run(payload).instrument(root).await
    }

    async fn run(&self, payload: Vec<String>) -> Result<Vec<String>, ProcessError> {
        let root = Span::current();
        let log_ctx = current_log_context(&self.service_name, PROCESS_OPERATION);

        correlated!(
            info,
            log_ctx,
            payload = ?payload,
            payload_size = payload.len(),
            "Processing request"
        );

        let mut modified = payload;
        modified.push(self.service_name.clone());
        root.record("payload.modified", field::debug(&modified));

        // FaultGate
        let started = Instant::now();
        self.instruments.set_active_requests(ACTIVE_REQUESTS_SENTINEL);
        self.instruments.add_requests(1, PROCESS_ENDPOINT);

        let delay_ms = self.faults.maybe_delay().await;
        correlated!(debug, log_ctx, simulated_latency_ms = delay_ms, "Simulated latency applied");

        if self.faults.should_fail() {
            let err = ProcessError::Simulated {
                service: self.service_name.clone(),
            };
            correlated!(
                error,
                log_ctx,
                error_percent = self.faults.config().error_percent,
                "Simulated error injected"
            );
            correlated!(error, log_ctx, severity = "CRITICAL", error = %err, "Request aborted by simulated error");
            tracing::error!(exception.message = %err, "exception.type" = err.kind(), "exception");
            return Err(self.fail(&root, &log_ctx, err));
        }

        let result = if self.destinations.is_empty() {
            Ok(modified)
        } else {
            self.chain.forward(modified, &self.destinations, &log_ctx).await
        };

        match result {
            Ok(payload) => {
                root.record("otel.status_code", "OK");
                let elapsed = started.elapsed().as_secs_f64();
                correlated!(
                    info,
                    log_ctx,
                    result_payload = ?payload,
                    processing_duration = elapsed,
                    "Request processed successfully"
                );
                self.instruments.record_response_time(elapsed, PROCESS_ENDPOINT);
                Ok(payload)
            }
            Err(err) => Err(self.fail(&root, &log_ctx, err)),
        }
    }

    fn fail(&self, root: &Span, log_ctx: &LogContext, err: ProcessError) -> ProcessError {
        root.record("otel.status_code", "ERROR");
        root.record("otel.status_message", field::display(&err));
        correlated!(
            error,
            log_ctx,
            status = err.status().as_u16(),
            error_kind = err.kind(),
            destination_url = err.destination(),
            "Request failed"
        );
        err
    }
}
