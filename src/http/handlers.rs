use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::http::server::AppState;
use crate::pipeline::ProcessError;

/// Sentinel the active-request gauge is set to by the health endpoint.
const ROOT_ACTIVE_REQUESTS: f64 = 1.0;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// `GET /`: identity and health check.
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    tracing::info!(
        service_name = %state.service_name,
        endpoint = "/",
        operation = "health_check",
        "Root endpoint accessed"
    );

    let start = Instant::now();
    state.instruments.set_active_requests(ROOT_ACTIVE_REQUESTS);
    state.instruments.add_requests(1, "/");
    state
        .instruments
        .record_response_time(start.elapsed().as_secs_f64(), "/");

    Json(json!({ "message": format!("Esse é o serviço {}", state.service_name) }))
}

/// `GET /metrics`: Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    tracing::debug!(
        service_name = %state.service_name,
        endpoint = "/metrics",
        operation = "metrics_export",
        "Metrics endpoint accessed"
    );

    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        state.metrics.render(),
    )
}

/// `POST /process`: run the request pipeline.
pub async fn process(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<Vec<String>>, JsonRejection>,
) -> Result<Json<Vec<String>>, ProcessError> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::warn!(
            service_name = %state.service_name,
            operation = "process_request",
            error = %rejection.body_text(),
            "Rejected malformed payload"
        );
        ProcessError::Validation {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    })?;

    let result = state.orchestrator.process(payload, &headers).await?;
    Ok(Json(result))
}
