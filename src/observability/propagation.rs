//! W3C Trace Context propagation over HTTP headers.
//!
//! The same `http::HeaderMap` type backs axum requests and reqwest requests,
//! so one injector/extractor pair serves both directions.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::propagation::{Extractor, Injector, TextMapPropagator};
use opentelemetry::Context;
use opentelemetry_sdk::propagation::TraceContextPropagator;

pub const TRACEPARENT: &str = "traceparent";

/// A [`HeaderMap`]-backed injector for OpenTelemetry propagators.
pub struct HeaderInjector<'a>(pub &'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let (Ok(name), Ok(val)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            self.0.insert(name, val);
        }
    }
}

/// A [`HeaderMap`]-backed extractor for OpenTelemetry propagators.
pub struct HeaderExtractor<'a>(pub &'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Write `traceparent` (and `tracestate`, when present) for `cx` into `headers`.
pub fn inject_context(propagator: &TraceContextPropagator, cx: &Context, headers: &mut HeaderMap) {
    propagator.inject_context(cx, &mut HeaderInjector(headers));
}

/// Read the caller's trace context. Missing or malformed headers yield a
/// context without a valid span.
pub fn extract_context(propagator: &TraceContextPropagator, headers: &HeaderMap) -> Context {
    propagator.extract(&HeaderExtractor(headers))
}
