//! Propagation chain behavior against real downstream listeners.

use std::time::Duration;

use axum::http::StatusCode;
use opentelemetry::trace::Status;
use tracing::Instrument;

use chaos_relay::observability::LogContext;
use chaos_relay::pipeline::{ProcessError, PropagationChain};

mod common;

fn log_ctx() -> LogContext {
    LogContext {
        service_name: "app-a".into(),
        operation: "process_request",
        trace_id: None,
        span_id: None,
    }
}

async fn forward(
    chain: &PropagationChain,
    payload: &[&str],
    destinations: &[String],
) -> Result<Vec<String>, ProcessError> {
    let payload = payload.iter().map(|s| s.to_string()).collect();
    chain
        .forward(payload, destinations, &log_ctx())
        .instrument(tracing::info_span!("process-request", otel.status_code = tracing::field::Empty))
        .await
}

#[tokio::test]
async fn test_empty_chain_is_identity() {
    let chain = PropagationChain::new(common::test_client());
    let result = forward(&chain, &["x", "app-a"], &[]).await.unwrap();
    assert_eq!(result, vec!["x", "app-a"]);
}

#[tokio::test]
async fn test_each_hop_sees_previous_response() {
    let b = common::start_appending_backend("app-b").await;
    let c = common::start_appending_backend("app-c").await;
    let chain = PropagationChain::new(common::test_client());

    let result = forward(&chain, &["x", "app-a"], &[b.url.clone(), c.url.clone()])
        .await
        .unwrap();

    assert_eq!(result, vec!["x", "app-a", "app-b", "app-c"]);
    assert_eq!(b.hits(), 1);
    assert_eq!(c.hits(), 1);
}

#[tokio::test]
async fn test_response_replaces_payload() {
    let first = common::start_programmable_backend(|_| async { (200, r#"["x"]"#.to_string()) }).await;
    let second = common::start_programmable_backend(|mut payload| async move {
        payload.push("y".to_string());
        (200, serde_json::to_string(&payload).unwrap())
    })
    .await;
    let chain = PropagationChain::new(common::test_client());

    let result = forward(&chain, &["a", "b", "c"], &[first.url.clone(), second.url.clone()])
        .await
        .unwrap();

    assert_eq!(result, vec!["x", "y"]);
}

#[tokio::test]
async fn test_non_200_stops_the_chain() {
    let a = common::start_failing_backend(503).await;
    let b = common::start_appending_backend("app-b").await;
    let c = common::start_appending_backend("app-c").await;
    let chain = PropagationChain::new(common::test_client());

    let err = forward(&chain, &["x"], &[a.url.clone(), b.url.clone(), c.url.clone()])
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(err.destination(), Some(a.url.as_str()));
    assert_eq!(err.to_string(), format!("error sending to {}: 503", a.url));
    assert_eq!(a.hits(), 1);
    assert_eq!(b.hits(), 0);
    assert_eq!(c.hits(), 0);
}

#[tokio::test]
async fn test_non_200_success_class_is_still_a_failure() {
    let a = common::start_programmable_backend(|payload| async move {
        (201, serde_json::to_string(&payload).unwrap())
    })
    .await;
    let chain = PropagationChain::new(common::test_client());

    let err = forward(&chain, &["x"], &[a.url.clone()]).await.unwrap_err();
    assert!(matches!(err, ProcessError::DownstreamStatus { status: 201, .. }));
}

#[tokio::test]
async fn test_unreachable_destination_is_transport_error() {
    let dead = common::unreachable_url();
    let b = common::start_appending_backend("app-b").await;
    let chain = PropagationChain::new(common::test_client());

    let err = forward(&chain, &["x"], &[dead.clone(), b.url.clone()])
        .await
        .unwrap_err();

    assert!(matches!(err, ProcessError::DownstreamTransport { .. }));
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(err.destination(), Some(dead.as_str()));
    assert_eq!(b.hits(), 0);
}

#[tokio::test]
async fn test_slow_destination_times_out() {
    let slow = common::start_programmable_backend(|payload| async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        (200, serde_json::to_string(&payload).unwrap())
    })
    .await;
    let chain = PropagationChain::new(common::test_client()).with_timeout(Duration::from_millis(50));

    let err = forward(&chain, &["x"], &[slow.url.clone()]).await.unwrap_err();
    match err {
        ProcessError::DownstreamTransport { ref source, .. } => assert!(source.is_timeout()),
        other => panic!("expected transport error, got {other:?}"),
    }
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_undecodable_body_is_transport_error() {
    let a = common::start_programmable_backend(|_| async { (200, "not json".to_string()) }).await;
    let chain = PropagationChain::new(common::test_client());

    let err = forward(&chain, &["x"], &[a.url.clone()]).await.unwrap_err();
    assert!(matches!(err, ProcessError::DownstreamTransport { .. }));
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_traceparent_carries_hop_span() {
    let harness = common::TraceHarness::install();
    let a = common::start_appending_backend("app-b").await;
    let chain = PropagationChain::new(common::test_client());

    forward(&chain, &["x"], &[a.url.clone()]).await.unwrap();

    let traceparent = a.last_header("traceparent").expect("traceparent header");
    let root = harness.span("process-request");
    let hop = harness.span("send-request");

    let trace_id = format!("{:032x}", root.span_context.trace_id());
    assert_eq!(common::traceparent_trace_id(&traceparent), trace_id);
    assert_eq!(hop.span_context.trace_id(), root.span_context.trace_id());
    assert_eq!(hop.parent_span_id, root.span_context.span_id());

    let hop_span_id = format!("{:016x}", hop.span_context.span_id());
    assert_eq!(traceparent.split('-').nth(2), Some(hop_span_id.as_str()));
}

#[tokio::test]
async fn test_transport_failure_marks_spans() {
    let harness = common::TraceHarness::install();
    let chain = PropagationChain::new(common::test_client());

    forward(&chain, &["x"], &[common::unreachable_url()])
        .await
        .unwrap_err();

    let root = harness.span("process-request");
    let hop = harness.span("send-request");
    assert!(matches!(root.status, Status::Error { .. }));
    assert!(matches!(hop.status, Status::Error { .. }));
    assert!(root.events.events.iter().any(|event| event.name == "exception"));
}
