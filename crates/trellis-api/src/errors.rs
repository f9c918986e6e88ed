//! # Error Handler Registry
//!
//! Every failure of a dispatched request ends here. Handlers are tried in
//! registration order and the first whose `can_handle` accepts the error
//! produces the response.
//!
//! With defaults enabled, four handlers run after the project's own:
//!
//! | Matches              | Status           | `message`            | `error`              |
//! |----------------------|------------------|----------------------|----------------------|
//! | [`ValidationResult`] | 400              | `"Validation failed"`| field → message map  |
//! | [`AppError`]         | its own          | the error message    | the error message    |
//! | [`MalformedBody`]    | 400              | `"Malformed request body"` | parser message |
//! | anything             | 500              | error text or generic fallback | same       |
//!
//! The catch-all makes [`ErrorRegistry::handle`] total when defaults are on.
//! With defaults off, an unmatched error gets [`fallback_response`].

use std::fmt;
use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;
use trellis_core::{AppError, Envelope, ValidationResult};

use crate::reply::envelope_response;
use crate::request::{MalformedBody, RequestInfo};

/// Message used when a 500 carries no text of its own.
pub const GENERIC_ERROR_MESSAGE: &str = "Internal server error";

/// Message of the validation-failure envelope.
pub const VALIDATION_FAILED_MESSAGE: &str = "Validation failed";

/// Translates one class of error into a response.
pub trait ErrorHandler: Send + Sync {
    /// Whether this handler claims `error`.
    fn can_handle(&self, error: &anyhow::Error) -> bool;

    /// Build the response for a claimed error.
    fn handle(&self, error: &anyhow::Error, request: &RequestInfo) -> Response;
}

/// Failure envelope at `status` with `message` and `error`.
pub fn error_response(status: u16, message: impl Into<String>, error: Value) -> Response {
    envelope_response(status, Envelope::failure(Some(message.into()), error))
}

/// Response used when no handler claims an error.
pub fn fallback_response() -> Response {
    error_response(500, GENERIC_ERROR_MESSAGE, Value::String(GENERIC_ERROR_MESSAGE.into()))
}

// ── Registry ────────────────────────────────────────────────────────

/// Ordered handler chain.
#[derive(Clone)]
pub struct ErrorRegistry {
    handlers: Vec<Arc<dyn ErrorHandler>>,
    defaults: bool,
}

impl Default for ErrorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ErrorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorRegistry")
            .field("handlers", &self.handlers.len())
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl ErrorRegistry {
    /// Empty chain with defaults enabled.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            defaults: true,
        }
    }

    /// Empty chain without the default handlers.
    pub fn without_defaults() -> Self {
        Self {
            handlers: Vec::new(),
            defaults: false,
        }
    }

    /// Enable or disable the default handlers.
    pub fn set_defaults(&mut self, enabled: bool) -> &mut Self {
        self.defaults = enabled;
        self
    }

    /// Whether the default handlers run after the registered ones.
    pub fn defaults_enabled(&self) -> bool {
        self.defaults
    }

    /// Append a handler.
    pub fn register(&mut self, handler: impl ErrorHandler + 'static) -> &mut Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Append an already shared handler.
    pub fn register_shared(&mut self, handler: Arc<dyn ErrorHandler>) -> &mut Self {
        self.handlers.push(handler);
        self
    }

    /// Append several handlers in order.
    pub fn register_all(&mut self, handlers: impl IntoIterator<Item = Arc<dyn ErrorHandler>>) -> &mut Self {
        self.handlers.extend(handlers);
        self
    }

    /// Remove every registered handler. Defaults are unaffected.
    pub fn clear(&mut self) -> &mut Self {
        self.handlers.clear();
        self
    }

    /// Number of registered handlers, excluding defaults.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Response from the first handler claiming `error`, if any.
    pub fn handle(&self, error: &anyhow::Error, request: &RequestInfo) -> Option<Response> {
        if let Some(handler) = self.handlers.iter().find(|h| h.can_handle(error)) {
            return Some(handler.handle(error, request));
        }
        if !self.defaults {
            return None;
        }
        DEFAULT_HANDLERS
            .iter()
            .find(|h| h.can_handle(error))
            .map(|h| h.handle(error, request))
    }

    /// [`handle`](Self::handle), falling back to a generic 500.
    pub fn respond(&self, error: &anyhow::Error, request: &RequestInfo) -> Response {
        self.handle(error, request).unwrap_or_else(|| {
            tracing::error!(
                method = %request.method,
                uri = %request.uri,
                error = %error,
                "no error handler matched"
            );
            fallback_response()
        })
    }
}

// ── Handlers from closures ──────────────────────────────────────────

/// Handler built from a predicate and a response function.
pub struct FnErrorHandler<P, H> {
    predicate: P,
    handler: H,
}

impl<P, H> FnErrorHandler<P, H>
where
    P: Fn(&anyhow::Error) -> bool + Send + Sync,
    H: Fn(&anyhow::Error, &RequestInfo) -> Response + Send + Sync,
{
    /// Handler claiming errors for which `predicate` holds.
    pub fn new(predicate: P, handler: H) -> Self {
        Self { predicate, handler }
    }
}

impl<P, H> ErrorHandler for FnErrorHandler<P, H>
where
    P: Fn(&anyhow::Error) -> bool + Send + Sync,
    H: Fn(&anyhow::Error, &RequestInfo) -> Response + Send + Sync,
{
    fn can_handle(&self, error: &anyhow::Error) -> bool {
        (self.predicate)(error)
    }

    fn handle(&self, error: &anyhow::Error, request: &RequestInfo) -> Response {
        (self.handler)(error, request)
    }
}

/// Handler claiming errors that downcast to `E`.
pub struct TypedErrorHandler<E, H> {
    handler: H,
    _marker: std::marker::PhantomData<fn() -> E>,
}

/// Handler for errors of type `E`.
///
/// ```
/// use axum::response::IntoResponse;
/// use axum::http::StatusCode;
/// use trellis_api::errors::{on, ErrorRegistry};
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("quota exceeded")]
/// struct QuotaExceeded;
///
/// let mut registry = ErrorRegistry::new();
/// registry.register(on::<QuotaExceeded, _>(|_err, _req| {
///     StatusCode::TOO_MANY_REQUESTS.into_response()
/// }));
/// ```
pub fn on<E, H>(handler: H) -> TypedErrorHandler<E, H>
where
    E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    H: Fn(&E, &RequestInfo) -> Response + Send + Sync,
{
    TypedErrorHandler {
        handler,
        _marker: std::marker::PhantomData,
    }
}

impl<E, H> ErrorHandler for TypedErrorHandler<E, H>
where
    E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    H: Fn(&E, &RequestInfo) -> Response + Send + Sync,
{
    fn can_handle(&self, error: &anyhow::Error) -> bool {
        error.downcast_ref::<E>().is_some()
    }

    fn handle(&self, error: &anyhow::Error, request: &RequestInfo) -> Response {
        match error.downcast_ref::<E>() {
            Some(typed) => (self.handler)(typed, request),
            None => CatchAllHandler.handle(error, request),
        }
    }
}

// ── Default handlers ────────────────────────────────────────────────

static DEFAULT_HANDLERS: [&(dyn ErrorHandler); 4] = [
    &ValidationHandler,
    &AppErrorHandler,
    &MalformedBodyHandler,
    &CatchAllHandler,
];

/// 400 with the per-field message map.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationHandler;

impl ErrorHandler for ValidationHandler {
    fn can_handle(&self, error: &anyhow::Error) -> bool {
        error.downcast_ref::<ValidationResult>().is_some()
    }

    fn handle(&self, error: &anyhow::Error, _request: &RequestInfo) -> Response {
        let fields = error
            .downcast_ref::<ValidationResult>()
            .map(|result| Value::Object(result.field_errors()))
            .unwrap_or(Value::Null);
        error_response(400, VALIDATION_FAILED_MESSAGE, fields)
    }
}

/// The error's own status, message in both `message` and `error`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppErrorHandler;

impl ErrorHandler for AppErrorHandler {
    fn can_handle(&self, error: &anyhow::Error) -> bool {
        error.downcast_ref::<AppError>().is_some()
    }

    fn handle(&self, error: &anyhow::Error, request: &RequestInfo) -> Response {
        let Some(app_error) = error.downcast_ref::<AppError>() else {
            return CatchAllHandler.handle(error, request);
        };
        let status = app_error.status_code();
        if status >= 500 {
            tracing::error!(status, uri = %request.uri, error = %app_error, "application error");
        }
        let message = app_error.message().to_string();
        error_response(status, message.clone(), Value::String(message))
    }
}

/// 400 for bodies that failed to parse.
#[derive(Debug, Clone, Copy, Default)]
pub struct MalformedBodyHandler;

impl ErrorHandler for MalformedBodyHandler {
    fn can_handle(&self, error: &anyhow::Error) -> bool {
        error.downcast_ref::<MalformedBody>().is_some()
    }

    fn handle(&self, error: &anyhow::Error, _request: &RequestInfo) -> Response {
        error_response(400, "Malformed request body", Value::String(error.to_string()))
    }
}

/// 500 for anything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatchAllHandler;

impl ErrorHandler for CatchAllHandler {
    fn can_handle(&self, _error: &anyhow::Error) -> bool {
        true
    }

    fn handle(&self, error: &anyhow::Error, request: &RequestInfo) -> Response {
        tracing::error!(
            method = %request.method,
            uri = %request.uri,
            request_id = request.request_id.as_deref().unwrap_or("-"),
            error = ?error,
            "unhandled error"
        );
        let text = error.to_string();
        let message = if text.trim().is_empty() {
            GENERIC_ERROR_MESSAGE.to_string()
        } else {
            text
        };
        error_response(500, message.clone(), Value::String(message))
    }
}
