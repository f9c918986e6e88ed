//! # Middleware
//!
//! Module and route middleware are declared as [`Middleware`] values:
//! either an async function over `(Request, Next)` or the name of one
//! registered on the [`App`](crate::App). Names are resolved when the router
//! is built; a name with no registration is logged at `warn` and skipped.
//!
//! Execution order for one route:
//!
//! ```text
//! CatchPanic → Trace → RequestId → Cors → module middleware → route middleware → Handler
//! ```

pub mod request_id;
pub mod tracing_layer;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use axum::routing::MethodRouter;

pub use request_id::{request_id_middleware, REQUEST_ID_HEADER};

/// Boxed, sendable future.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Type-erased middleware function.
pub type MiddlewareFn = Arc<dyn Fn(Request, Next) -> BoxFuture<Response> + Send + Sync>;

/// A middleware entry on a module or route.
#[derive(Clone)]
pub enum Middleware {
    /// Invocable middleware.
    Fn(MiddlewareFn),
    /// Reference to middleware registered on the app under this name.
    Named(String),
}

impl Middleware {
    /// Wrap an async function over `(Request, Next)`.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self::Fn(erase(f))
    }

    /// Reference middleware registered with [`App::middleware`](crate::App::middleware).
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// The invocable function, looking names up in `table`.
    pub(crate) fn resolve(&self, table: &HashMap<String, MiddlewareFn>) -> Option<MiddlewareFn> {
        match self {
            Self::Fn(f) => Some(Arc::clone(f)),
            Self::Named(name) => table.get(name).cloned(),
        }
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fn(_) => f.write_str("Middleware::Fn(..)"),
            Self::Named(name) => f.debug_tuple("Middleware::Named").field(name).finish(),
        }
    }
}

impl From<&str> for Middleware {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

pub(crate) fn erase<F, Fut>(f: F) -> MiddlewareFn
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |request: Request, next: Next| -> BoxFuture<Response> {
        Box::pin(f(request, next))
    })
}

/// Resolve `entries` against `table`, dropping (and reporting) unresolved ones.
pub(crate) fn resolve_all(
    entries: &[Middleware],
    table: &HashMap<String, MiddlewareFn>,
    scope: &str,
) -> Vec<MiddlewareFn> {
    entries
        .iter()
        .filter_map(|entry| {
            let resolved = entry.resolve(table);
            if resolved.is_none() {
                tracing::warn!(scope, middleware = ?entry, "middleware is not registered; skipping");
            }
            resolved
        })
        .collect()
}

/// Wrap `route` so `chain[0]` runs first.
pub(crate) fn apply(mut route: MethodRouter, chain: &[MiddlewareFn]) -> MethodRouter {
    for mw in chain.iter().rev() {
        let mw = Arc::clone(mw);
        route = route.layer(axum::middleware::from_fn(
            move |request: Request, next: Next| mw(request, next),
        ));
    }
    route
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    fn deny() -> Middleware {
        Middleware::from_fn(|_req: Request, _next: Next| async {
            StatusCode::FORBIDDEN.into_response()
        })
    }

    #[test]
    fn named_entries_resolve_against_the_table() {
        let mut table = HashMap::new();
        if let Middleware::Fn(f) = deny() {
            table.insert("deny".to_string(), f);
        }
        assert!(Middleware::named("deny").resolve(&table).is_some());
        assert!(Middleware::from("missing").resolve(&table).is_none());
        assert!(deny().resolve(&HashMap::new()).is_some());
    }

    #[test]
    fn unresolved_entries_are_skipped() {
        let chain = resolve_all(
            &[deny(), Middleware::named("ghost"), deny()],
            &HashMap::new(),
            "test",
        );
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn debug_does_not_expose_closures() {
        assert_eq!(format!("{:?}", deny()), "Middleware::Fn(..)");
        assert_eq!(
            format!("{:?}", Middleware::named("auth")),
            "Middleware::Named(\"auth\")"
        );
    }
}
