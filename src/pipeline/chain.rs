//! Sequential downstream propagation.
//!
//! # Responsibilities
//! - Forward the payload to each destination in configured order
//! - Inject W3C trace context from each hop's span into its request
//! - Replace the payload with each successful response body
//! - Stop at the first failing hop
//!
//! # Design Decisions
//! - One attempt per hop, fixed timeout, no retries and no parallel fan-out
//! - Status failures map to 502, transport failures to 400

use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use tracing::{field, Instrument, Span};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::observability::correlated;
use crate::observability::propagation::inject_context;
use crate::observability::LogContext;
use crate::pipeline::error::ProcessError;

/// Per-hop request timeout.
pub const HOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Forwards payloads through an ordered list of downstream services.
#[derive(Debug, Clone)]
pub struct PropagationChain {
    client: reqwest::Client,
    propagator: TraceContextPropagator,
    timeout: Duration,
}

impl PropagationChain {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            propagator: TraceContextPropagator::new(),
            timeout: HOP_TIMEOUT,
        }
    }

    /// Override the per-hop timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Relay `payload` through `destinations`.
    ///
    /// Must run inside the request's root span: hop spans are its children and
    /// transport failures are recorded on it.
    pub async fn forward(
        &self,
        payload: Vec<String>,
        destinations: &[String],
        log_ctx: &LogContext,
    ) -> Result<Vec<String>, ProcessError> {
        let parent = Span::current();
        let mut payload = payload;

        for destination in destinations {
            let hop = tracing::info_span!(
                "send-request",
                destination.url = %destination,
                http.status_code = field::Empty,
                otel.status_code = field::Empty,
            );

            payload = self
                .send(destination, &payload, log_ctx, &parent, &hop)
                .instrument(hop.clone())
                .await?;
        }

        Ok(payload)
    }

    async fn send(
        &self,
        destination: &str,
        payload: &[String],
        log_ctx: &LogContext,
        parent: &Span,
        hop: &Span,
    ) -> Result<Vec<String>, ProcessError> {
        correlated!(
            debug,
            log_ctx,
            destination_url = %destination,
            "Forwarding payload downstream"
        );

        let mut headers = HeaderMap::new();
        inject_context(&self.propagator, &hop.context(), &mut headers);

        let response = self
            .client
            .post(format!("{}/process", destination))
            .headers(headers)
            .json(payload)
            .timeout(self.timeout)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => return Err(self.transport_failure(destination, e, log_ctx, parent, hop)),
        };

        let status = response.status();
        hop.record("http.status_code", status.as_u16());

        if status != StatusCode::OK {
            hop.record("otel.status_code", "ERROR");
            correlated!(
                error,
                log_ctx,
                destination_url = %destination,
                response_status = status.as_u16(),
                "Downstream returned a non-success status"
            );
            return Err(ProcessError::DownstreamStatus {
                destination: destination.to_string(),
                status: status.as_u16(),
            });
        }

        match response.json::<Vec<String>>().await {
            Ok(next) => Ok(next),
            Err(e) => Err(self.transport_failure(destination, e, log_ctx, parent, hop)),
        }
    }

    fn transport_failure(
        &self,
        destination: &str,
        source: reqwest::Error,
        log_ctx: &LogContext,
        parent: &Span,
        hop: &Span,
    ) -> ProcessError {
        hop.record("otel.status_code", "ERROR");
        correlated!(
            error,
            log_ctx,
            destination_url = %destination,
            error_message = %source,
            timed_out = source.is_timeout(),
            "Downstream request failed"
        );

        let err = ProcessError::DownstreamTransport {
            destination: destination.to_string(),
            source,
        };

        tracing::error!(
            parent: parent,
            exception.message = %err,
            "exception.type" = err.kind(),
            "exception"
        );
        parent.record("otel.status_code", "ERROR");

        err
    }
}
