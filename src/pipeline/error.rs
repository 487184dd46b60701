//! Pipeline error taxonomy and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Terminal failure of one `/process` request.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Injected by configuration; not a real fault.
    #[error("simulated error in service {service}")]
    Simulated { service: String },

    /// A hop answered with something other than 200.
    #[error("error sending to {destination}: {status}")]
    DownstreamStatus { destination: String, status: u16 },

    /// A hop could not be reached, timed out, or sent an unreadable body.
    #[error("request to {destination} failed: {source}")]
    DownstreamTransport {
        destination: String,
        #[source]
        source: reqwest::Error,
    },

    /// The inbound body is not a JSON array of strings.
    #[error("invalid payload: {message}")]
    Validation { status: StatusCode, message: String },
}

impl ProcessError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProcessError::Simulated { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ProcessError::DownstreamStatus { .. } => StatusCode::BAD_GATEWAY,
            ProcessError::DownstreamTransport { .. } => StatusCode::BAD_REQUEST,
            ProcessError::Validation { status, .. } => *status,
        }
    }

    /// Stable name for logs and `exception.type`.
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessError::Simulated { .. } => "SimulatedError",
            ProcessError::DownstreamStatus { .. } => "DownstreamStatusError",
            ProcessError::DownstreamTransport { .. } => "DownstreamTransportError",
            ProcessError::Validation { .. } => "ValidationError",
        }
    }

    /// Destination that caused the failure, if any.
    pub fn destination(&self) -> Option<&str> {
        match self {
            ProcessError::DownstreamStatus { destination, .. }
            | ProcessError::DownstreamTransport { destination, .. } => Some(destination),
            _ => None,
        }
    }
}

impl IntoResponse for ProcessError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}
