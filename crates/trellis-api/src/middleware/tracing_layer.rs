//! # Request/Response Tracing
//!
//! HTTP spans for every request. The request id middleware runs outside this
//! layer, so each span carries the `x-request-id` the response will echo.

use axum::extract::Request;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::request_id::REQUEST_ID_HEADER;

/// The trace layer type installed by the dispatcher.
pub type HttpTraceLayer = TraceLayer<SharedClassifier<ServerErrorsAsFailures>, fn(&Request) -> Span>;

/// Build the `TraceLayer` wrapped around the whole router.
///
/// Spans come from [`make_span`]; the response status and latency are
/// logged when the request completes.
pub fn layer() -> HttpTraceLayer {
    TraceLayer::new_for_http().make_span_with(make_span as fn(&Request) -> Span)
}

/// `http` span with method, URI, version and request id (`-` when absent).
pub fn make_span(request: &Request) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "http",
        method = %request.method(),
        uri = %request.uri(),
        version = ?request.version(),
        request_id,
    )
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Arc;

    use axum::body::Body;
    use parking_lot::Mutex;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn logged_inside(request: &Request) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            let span = make_span(request);
            let _entered = span.enter();
            tracing::info!("handled");
        });
        let bytes = captured.0.lock().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn span_records_incoming_request_id() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/users")
            .header(REQUEST_ID_HEADER, "req-42")
            .body(Body::empty())
            .unwrap();

        let line = logged_inside(&request);
        assert!(line.contains("http{"), "{line}");
        assert!(line.contains("method=POST"), "{line}");
        assert!(line.contains("uri=/api/users"), "{line}");
        assert!(line.contains("req-42"), "{line}");
    }

    #[test]
    fn span_marks_missing_request_id() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let line = logged_inside(&request);
        assert!(line.contains("request_id"), "{line}");
        assert!(!line.contains("req-42"), "{line}");
    }

    #[test]
    fn layer_constructs_without_panic() {
        let _layer = layer();
    }
}
