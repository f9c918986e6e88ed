//! # Request Dispatcher
//!
//! Turns the module registry into an Axum [`Router`]:
//!
//! 1. Each module gets a sub-router. Every route is registered at
//!    `{api_prefix}{module prefix}{route path}` behind the module's
//!    middleware followed by its own.
//! 2. Sub-routers are merged into the root in registration order.
//! 3. Unmatched paths (404) and unsupported methods (405) are raised as
//!    [`AppError`]s so they reach the error registry like any other failure.
//! 4. Global layers wrap the tree.
//!
//! Each handler call goes through [`dispatch`]: read the request, invoke the
//! controller method, then either render the [`Reply`](crate::Reply) or pass
//! the error to the registry. Nothing is formatted locally on failure.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::routing::MethodRouter;
use axum::Router;
use thiserror::Error;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any as AnyOrigin, CorsLayer};
use trellis_core::config::normalize_prefix;
use trellis_core::{AppError, FrameworkConfig};

use crate::app::App;
use crate::errors::ErrorRegistry;
use crate::middleware::{self, MiddlewareFn};
use crate::openapi;
use crate::request::{RequestContext, RequestInfo};
use crate::routing::{ErasedHandler, HttpMethod};

/// A handler panicked; the panic payload's text when it had one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("handler panicked: {0}")]
pub struct HandlerPanic(pub String);

/// Join mount segments into one route path.
pub fn join_path(segments: &[&str]) -> String {
    let joined: String = segments.iter().map(|s| normalize_prefix(s)).collect();
    if joined.is_empty() {
        "/".to_string()
    } else {
        joined
    }
}

/// Run one request through a bound handler.
pub(crate) async fn dispatch(
    handler: ErasedHandler,
    errors: &ErrorRegistry,
    body_limit: usize,
    request: Request,
) -> Response {
    let info = RequestInfo::of(&request);
    let outcome = match RequestContext::from_request(request, body_limit).await {
        Ok(context) => handler(context).await,
        Err(malformed) => Err(malformed.into()),
    };
    match outcome {
        Ok(reply) => reply.into_response(),
        Err(error) => errors.respond(&error, &info),
    }
}

fn endpoint(
    method: HttpMethod,
    handler: ErasedHandler,
    errors: Arc<ErrorRegistry>,
    body_limit: usize,
) -> MethodRouter {
    axum::routing::on(method.filter(), move |request: Request| {
        let handler = Arc::clone(&handler);
        let errors = Arc::clone(&errors);
        async move { dispatch(handler, &errors, body_limit, request).await }
    })
}

/// Build the router for `app`.
pub(crate) fn build(app: &App) -> Router {
    let config = &app.config;
    let errors = Arc::new(app.errors.clone());
    let mut router = Router::new();

    for module in app.modules.modules() {
        let module_chain = middleware::resolve_all(module.middlewares(), &app.middleware, module.prefix());
        let mut sub = Router::new();
        for route in module.routes() {
            let path = join_path(&[config.api_prefix.as_str(), module.prefix(), route.path()]);
            let mut chain: Vec<MiddlewareFn> = module_chain.clone();
            chain.extend(middleware::resolve_all(route.middlewares(), &app.middleware, &path));

            let method_router = endpoint(route.method(), route.handler(), Arc::clone(&errors), config.body_limit);
            sub = sub.route(&path, middleware::apply(method_router, &chain));
            tracing::debug!(
                method = %route.method(),
                path = %path,
                handler = route.handler_name(),
                middlewares = chain.len(),
                "route mounted"
            );
        }
        tracing::info!(
            prefix = module.prefix(),
            name = module.module_name().unwrap_or("-"),
            routes = module.routes().len(),
            "module mounted"
        );
        router = router.merge(sub);
    }

    if config.openapi {
        let path = join_path(&[config.api_prefix.as_str(), "openapi.json"]);
        router = router.merge(openapi::router(&path, openapi::document(&app.modules, config, &app.info)));
    }

    let not_found_errors = Arc::clone(&errors);
    let not_allowed_errors = Arc::clone(&errors);
    router = router
        .fallback(move |request: Request| {
            let errors = Arc::clone(&not_found_errors);
            async move {
                let info = RequestInfo::of(&request);
                let error = AppError::NotFound(format!("Cannot {} {}", info.method, info.uri.path()));
                errors.respond(&error.into(), &info)
            }
        })
        .method_not_allowed_fallback(move |request: Request| {
            let errors = Arc::clone(&not_allowed_errors);
            async move {
                let info = RequestInfo::of(&request);
                let error = AppError::status(
                    405,
                    format!("Method {} not allowed for {}", info.method, info.uri.path()),
                );
                errors.respond(&error.into(), &info)
            }
        });

    if let Some(context) = &app.context {
        router = router.layer(axum::Extension(Arc::clone(context)));
    }
    if let Some(cors) = cors_layer(config) {
        router = router.layer(cors);
    }
    router
        .layer(middleware::tracing_layer::layer())
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(CatchPanicLayer::custom(panic_handler(errors)))
}

/// CORS from `cors_origins`; `None` when the list is empty.
fn cors_layer(config: &FrameworkConfig) -> Option<CorsLayer> {
    if config.cors_origins.is_empty() {
        return None;
    }
    let layer = CorsLayer::new().allow_methods(AnyOrigin).allow_headers(AnyOrigin);
    if config.cors_origins.iter().any(|o| o == "*") {
        return Some(layer.allow_origin(AnyOrigin));
    }
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    Some(layer.allow_origin(AllowOrigin::list(origins)))
}

fn panic_handler(
    errors: Arc<ErrorRegistry>,
) -> impl Fn(Box<dyn Any + Send + 'static>) -> Response + Clone + Send + Sync + 'static {
    move |payload: Box<dyn Any + Send + 'static>| {
        let detail = if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else {
            "unknown panic payload".to_string()
        };
        errors.respond(&HandlerPanic(detail).into(), &RequestInfo::unknown())
    }
}

/// Route table for diagnostics: `(method, full path, handler name)`.
pub fn route_table(app: &App) -> Vec<(HttpMethod, String, &'static str)> {
    let mut table = Vec::new();
    for module in app.modules.modules() {
        for route in module.routes() {
            let path = join_path(&[app.config.api_prefix.as_str(), module.prefix(), route.path()]);
            table.push((route.method(), path, route.handler_name()));
        }
    }
    table
}

/// Routes grouped by full path, in first-seen order.
pub(crate) fn group_by_path<T>(entries: impl IntoIterator<Item = (String, T)>) -> Vec<(String, Vec<T>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<T>)> = Vec::new();
    for (path, item) in entries {
        match index.get(&path) {
            Some(&i) => groups[i].1.push(item),
            None => {
                index.insert(path.clone(), groups.len());
                groups.push((path, vec![item]));
            }
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_path_normalizes_slashes() {
        assert_eq!(join_path(&["/api", "/users", "/"]), "/api/users");
        assert_eq!(join_path(&["/api/", "users/", "{id}"]), "/api/users/{id}");
        assert_eq!(join_path(&["", "", "/"]), "/");
        assert_eq!(join_path(&["", "/health", "/live"]), "/health/live");
    }

    #[test]
    fn group_by_path_keeps_first_seen_order() {
        let groups = group_by_path([
            ("/b".to_string(), 1),
            ("/a".to_string(), 2),
            ("/b".to_string(), 3),
        ]);
        assert_eq!(groups, vec![("/b".to_string(), vec![1, 3]), ("/a".to_string(), vec![2])]);
    }

    #[test]
    fn cors_disabled_without_origins() {
        assert!(cors_layer(&FrameworkConfig::default()).is_none());
        let config = FrameworkConfig {
            cors_origins: vec!["*".into()],
            ..FrameworkConfig::default()
        };
        assert!(cors_layer(&config).is_some());
    }

    #[test]
    fn panic_payload_text_is_kept() {
        let err = HandlerPanic("boom".into());
        assert_eq!(err.to_string(), "handler panicked: boom");
    }
}
