//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use axum::body::Bytes;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SpanData};
use tokio::net::TcpListener;
use tracing::subscriber::DefaultGuard;
use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;

use chaos_relay::observability::metrics::install_recorder;
use chaos_relay::observability::Instruments;

/// A programmable downstream listening on an ephemeral port.
pub struct MockDownstream {
    pub url: String,
    hits: Arc<AtomicU32>,
    headers: Arc<Mutex<Vec<HeaderMap>>>,
}

impl MockDownstream {
    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::SeqCst)
    }

    /// Value of `name` on the most recent request, if sent.
    pub fn last_header(&self, name: &str) -> Option<String> {
        self.headers
            .lock()
            .unwrap()
            .last()
            .and_then(|headers| headers.get(name))
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }
}

/// Start a downstream whose `/process` answers with `f(payload)`.
pub async fn start_programmable_backend<F, Fut>(f: F) -> MockDownstream
where
    F: Fn(Vec<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let f = Arc::new(f);
    let hits = Arc::new(AtomicU32::new(0));
    let headers = Arc::new(Mutex::new(Vec::new()));

    let handler_hits = hits.clone();
    let handler_headers = headers.clone();
    let app = Router::new().route(
        "/process",
        post(move |request_headers: HeaderMap, body: Bytes| {
            let f = f.clone();
            let hits = handler_hits.clone();
            let headers = handler_headers.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                headers.lock().unwrap().push(request_headers);
                let payload: Vec<String> = serde_json::from_slice(&body).unwrap_or_default();
                let (status, body) = f(payload).await;
                (
                    StatusCode::from_u16(status).unwrap(),
                    [(header::CONTENT_TYPE, "application/json")],
                    body,
                )
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockDownstream {
        url: format!("http://{}", addr),
        hits,
        headers,
    }
}

/// Downstream that behaves like a healthy relay named `name`.
pub async fn start_appending_backend(name: &'static str) -> MockDownstream {
    start_programmable_backend(move |mut payload| async move {
        payload.push(name.to_string());
        (200, serde_json::to_string(&payload).unwrap())
    })
    .await
}

/// Downstream that always answers `status` with a JSON error body.
pub async fn start_failing_backend(status: u16) -> MockDownstream {
    start_programmable_backend(move |_| async move {
        (status, r#"{"error":"downstream failure"}"#.to_string())
    })
    .await
}

/// A base URL nothing is listening on.
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn test_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Process-wide Prometheus handle; the global recorder can only be set once.
pub fn metrics_handle() -> PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    HANDLE
        .get_or_init(|| install_recorder().unwrap())
        .clone()
}

/// [`Instruments`] fake that remembers every call.
#[derive(Default)]
pub struct RecordingInstruments {
    pub requests: Mutex<Vec<(u64, String)>>,
    pub active: Mutex<Vec<f64>>,
    pub response_times: Mutex<Vec<(f64, String)>>,
}

impl Instruments for RecordingInstruments {
    fn add_requests(&self, n: u64, endpoint: &str) {
        self.requests.lock().unwrap().push((n, endpoint.to_string()));
    }

    fn set_active_requests(&self, value: f64) {
        self.active.lock().unwrap().push(value);
    }

    fn record_response_time(&self, seconds: f64, endpoint: &str) {
        self.response_times
            .lock()
            .unwrap()
            .push((seconds, endpoint.to_string()));
    }
}

/// In-memory sink for JSON log lines.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn lines(&self) -> Vec<serde_json::Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Thread-scoped subscriber exporting spans to memory and logs to a buffer.
///
/// Only valid on a current-thread runtime, which is what `#[tokio::test]`
/// builds by default.
pub struct TraceHarness {
    pub exporter: InMemorySpanExporter,
    pub logs: LogBuffer,
    _provider: SdkTracerProvider,
    _guard: DefaultGuard,
}

impl TraceHarness {
    pub fn install() -> Self {
        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        let logs = LogBuffer::default();

        let subscriber = tracing_subscriber::registry()
            .with(tracing_opentelemetry::layer().with_tracer(provider.tracer("test")))
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_writer(logs.clone())
                    .with_filter(Targets::new().with_target("chaos_relay", Level::TRACE)),
            );
        let guard = tracing::subscriber::set_default(subscriber);

        Self {
            exporter,
            logs,
            _provider: provider,
            _guard: guard,
        }
    }

    pub fn spans(&self) -> Vec<SpanData> {
        self.exporter.get_finished_spans().unwrap()
    }

    pub fn span(&self, name: &str) -> SpanData {
        self.spans()
            .into_iter()
            .find(|span| span.name == name)
            .unwrap_or_else(|| panic!("no finished span named {name}"))
    }

    pub fn spans_named(&self, name: &str) -> Vec<SpanData> {
        self.spans()
            .into_iter()
            .filter(|span| span.name == name)
            .collect()
    }
}

/// Trace id carried by a `traceparent` header value.
pub fn traceparent_trace_id(traceparent: &str) -> &str {
    traceparent.split('-').nth(1).unwrap()
}
