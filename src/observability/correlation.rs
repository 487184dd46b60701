//! Log correlation with the active trace.
//!
//! A [`LogContext`] is derived once per request, after the root span is
//! active, and passed to every log call of that request through the
//! [`correlated!`] macro so all lines share one correlation identity.

use opentelemetry::trace::TraceContextExt;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Correlation fields attached to structured log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogContext {
    pub service_name: String,
    pub operation: &'static str,
    /// 32 lowercase hex characters.
    pub trace_id: Option<String>,
    /// 16 lowercase hex characters.
    pub span_id: Option<String>,
}

impl LogContext {
    /// True when trace fields are present.
    pub fn is_correlated(&self) -> bool {
        self.trace_id.is_some() && self.span_id.is_some()
    }
}

/// Correlation context of the currently entered span.
pub fn current_log_context(service_name: &str, operation: &'static str) -> LogContext {
    log_context_for(&Span::current(), service_name, operation)
}

/// Correlation context of `span`. Trace fields are omitted when the span has
/// no valid OpenTelemetry context, e.g. when no OTel layer is installed.
pub fn log_context_for(span: &Span, service_name: &str, operation: &'static str) -> LogContext {
    let cx = span.context();
    let otel_span = cx.span();
    let span_context = otel_span.span_context();

    let (trace_id, span_id) = if span_context.is_valid() {
        (
            Some(format!("{:032x}", span_context.trace_id())),
            Some(format!("{:016x}", span_context.span_id())),
        )
    } else {
        (None, None)
    };

    LogContext {
        service_name: service_name.to_string(),
        operation,
        trace_id,
        span_id,
    }
}

/// Emit a `tracing` event at `$level` carrying the fields of a [`LogContext`].
///
/// ```ignore
/// correlated!(info, log_ctx, payload_size = 3, "processing request");
/// ```
macro_rules! correlated {
    ($level:ident, $ctx:expr, $($rest:tt)+) => {
        ::tracing::$level!(
            service_name = %$ctx.service_name,
            operation = $ctx.operation,
            trace_id = $ctx.trace_id.as_deref(),
            span_id = $ctx.span_id.as_deref(),
            $($rest)+
        )
    };
}

pub(crate) use correlated;
