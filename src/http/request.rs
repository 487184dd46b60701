//! Request ID handling.
//!
//! Every request gets an `x-request-id` (UUID v4 unless the caller sent
//! one), and the same value is echoed on the response.

use axum::http::HeaderName;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Layers that assign and echo the request ID. Apply `SetRequestIdLayer`
/// outermost so the ID exists before tracing and propagation see the request.
pub fn request_id_layers() -> (SetRequestIdLayer<MakeRequestUuid>, PropagateRequestIdLayer) {
    (
        SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid),
        PropagateRequestIdLayer::new(X_REQUEST_ID),
    )
}
