//! # Routes and Modules
//!
//! Controllers are plain structs; their handlers are methods taking
//! `self: Arc<Self>` and a [`RequestContext`]:
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use trellis_api::{create_module, HandlerResult, Reply, RequestContext};
//!
//! struct PingController;
//!
//! impl PingController {
//!     async fn ping(self: Arc<Self>, _req: RequestContext) -> HandlerResult {
//!         Ok(Reply::Data(json!({"pong": true})))
//!     }
//! }
//!
//! let module = create_module("/system", PingController, |r| vec![r.get("/ping", PingController::ping)]);
//! assert_eq!(module.routes()[0].handler_name(), "ping");
//! ```
//!
//! A [`Binder`] ties one controller instance to its methods; each verb call
//! returns a [`RouteDefinition`]. [`create_module`] instantiates the
//! controller once and packages the routes into a [`ModuleDefinition`], and
//! [`ModuleRegistry`] keeps modules in mount order.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::routing::MethodFilter;

use crate::middleware::{BoxFuture, Middleware};
use crate::reply::{HandlerResult, Reply};
use crate::request::RequestContext;

pub(crate) type ErasedHandler = Arc<dyn Fn(RequestContext) -> BoxFuture<HandlerResult> + Send + Sync>;

// ── HTTP methods ────────────────────────────────────────────────────

/// HTTP methods a route can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// Upper-case method name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    pub(crate) fn filter(self) -> MethodFilter {
        match self {
            Self::Get => MethodFilter::GET,
            Self::Post => MethodFilter::POST,
            Self::Put => MethodFilter::PUT,
            Self::Patch => MethodFilter::PATCH,
            Self::Delete => MethodFilter::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Route definitions ───────────────────────────────────────────────

/// One controller method bound to a method and path.
#[derive(Clone)]
pub struct RouteDefinition {
    method: HttpMethod,
    path: String,
    handler: ErasedHandler,
    handler_name: &'static str,
    controller: Arc<dyn Any + Send + Sync>,
    controller_name: &'static str,
    middlewares: Vec<Middleware>,
}

impl RouteDefinition {
    /// Add route-level middleware, run after the module's.
    pub fn with(mut self, middleware: impl Into<Middleware>) -> Self {
        self.middlewares.push(middleware.into());
        self
    }

    /// HTTP method.
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Path relative to the module prefix.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Name of the bound controller method.
    pub fn handler_name(&self) -> &'static str {
        self.handler_name
    }

    /// Type name of the controller.
    pub fn controller_name(&self) -> &'static str {
        self.controller_name
    }

    /// The controller instance, if it is a `C`.
    pub fn controller<C: Send + Sync + 'static>(&self) -> Option<Arc<C>> {
        Arc::clone(&self.controller).downcast::<C>().ok()
    }

    /// Route-level middleware, in execution order.
    pub fn middlewares(&self) -> &[Middleware] {
        &self.middlewares
    }

    pub(crate) fn handler(&self) -> ErasedHandler {
        Arc::clone(&self.handler)
    }

    pub(crate) fn append_middlewares(&mut self, extra: &[Middleware]) {
        self.middlewares.extend_from_slice(extra);
    }
}

impl fmt::Debug for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("handler", &self.handler_name)
            .field("controller", &self.controller_name)
            .field("middlewares", &self.middlewares)
            .finish()
    }
}

/// Binds routes to one controller instance.
pub struct Binder<C> {
    controller: Arc<C>,
}

/// Binder over `controller`.
pub fn bind_controller<C: Send + Sync + 'static>(controller: Arc<C>) -> Binder<C> {
    Binder { controller }
}

macro_rules! verb {
    ($(#[$doc:meta])* $name:ident => $method:ident) => {
        $(#[$doc])*
        pub fn $name<F, Fut, R, E>(&self, path: &str, handler: F) -> RouteDefinition
        where
            F: Fn(Arc<C>, RequestContext) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Result<R, E>> + Send + 'static,
            R: Into<Reply>,
            E: Into<anyhow::Error>,
        {
            self.bind(HttpMethod::$method, path, handler)
        }
    };
}

impl<C: Send + Sync + 'static> Binder<C> {
    /// The bound controller.
    pub fn controller(&self) -> &Arc<C> {
        &self.controller
    }

    verb!(
        /// Bind `handler` to `GET path`.
        get => Get
    );
    verb!(
        /// Bind `handler` to `POST path`.
        post => Post
    );
    verb!(
        /// Bind `handler` to `PUT path`.
        put => Put
    );
    verb!(
        /// Bind `handler` to `PATCH path`.
        patch => Patch
    );
    verb!(
        /// Bind `handler` to `DELETE path`.
        delete => Delete
    );

    fn bind<F, Fut, R, E>(&self, method: HttpMethod, path: &str, handler: F) -> RouteDefinition
    where
        F: Fn(Arc<C>, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Into<Reply>,
        E: Into<anyhow::Error>,
    {
        let handler_name = short_name(std::any::type_name::<F>());
        let controller = Arc::clone(&self.controller);
        let erased: ErasedHandler = Arc::new(move |request: RequestContext| -> BoxFuture<HandlerResult> {
            let fut = handler(Arc::clone(&controller), request);
            Box::pin(async move {
                let result: HandlerResult = fut.await.map(Into::into).map_err(Into::into);
                result
            })
        });

        RouteDefinition {
            method,
            path: path.to_string(),
            handler: erased,
            handler_name,
            controller: Arc::clone(&self.controller) as Arc<dyn Any + Send + Sync>,
            controller_name: short_name(std::any::type_name::<C>()),
            middlewares: Vec::new(),
        }
    }
}

/// Last path segment of a type name, ignoring generic arguments.
fn short_name(full: &'static str) -> &'static str {
    let bytes = full.as_bytes();
    let mut depth = 0usize;
    let mut start = 0;
    let mut end = full.len();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'<' => {
                if depth == 0 {
                    end = i;
                }
                depth += 1;
            }
            b'>' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                start = i + 2;
                end = full.len();
            }
            _ => {}
        }
    }
    full.get(start..end).unwrap_or(full)
}

// ── Modules ─────────────────────────────────────────────────────────

/// Prefix-scoped, middleware-scoped group of routes on one controller.
#[derive(Debug, Clone, Default)]
pub struct ModuleDefinition {
    prefix: String,
    middlewares: Vec<Middleware>,
    routes: Vec<RouteDefinition>,
    name: Option<String>,
    description: Option<String>,
    tags: Vec<String>,
}

impl ModuleDefinition {
    /// Empty module at `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Append a route.
    pub fn route(mut self, route: RouteDefinition) -> Self {
        self.routes.push(route);
        self
    }

    /// Append module-level middleware.
    pub fn middleware(mut self, middleware: impl Into<Middleware>) -> Self {
        self.middlewares.push(middleware.into());
        self
    }

    /// Display name, used as the OpenAPI tag.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Description for the OpenAPI tag.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Extra OpenAPI tags for every route.
    pub fn tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Path prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Module-level middleware, in execution order.
    pub fn middlewares(&self) -> &[Middleware] {
        &self.middlewares
    }

    /// Routes in declaration order.
    pub fn routes(&self) -> &[RouteDefinition] {
        &self.routes
    }

    /// Display name.
    pub fn module_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Description.
    pub fn module_description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Extra tags.
    pub fn module_tags(&self) -> &[String] {
        &self.tags
    }
}

/// Optional settings for [`create_module_with`].
#[derive(Debug, Clone, Default)]
pub struct ModuleOptions {
    /// Module-level middleware.
    pub middlewares: Vec<Middleware>,
    /// Display name.
    pub name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Extra tags.
    pub tags: Vec<String>,
}

/// Module at `prefix` whose routes `build` binds on `controller`.
pub fn create_module<C, B>(prefix: impl Into<String>, controller: C, build: B) -> ModuleDefinition
where
    C: Send + Sync + 'static,
    B: FnOnce(&Binder<C>) -> Vec<RouteDefinition>,
{
    create_module_with(prefix, controller, ModuleOptions::default(), build)
}

/// [`create_module`] with middleware and metadata.
pub fn create_module_with<C, B>(
    prefix: impl Into<String>,
    controller: C,
    options: ModuleOptions,
    build: B,
) -> ModuleDefinition
where
    C: Send + Sync + 'static,
    B: FnOnce(&Binder<C>) -> Vec<RouteDefinition>,
{
    let binder = bind_controller(Arc::new(controller));
    ModuleDefinition {
        prefix: prefix.into(),
        middlewares: options.middlewares,
        routes: build(&binder),
        name: options.name,
        description: options.description,
        tags: options.tags,
    }
}

/// Modules in mount order.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: Vec<ModuleDefinition>,
}

impl ModuleRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one module.
    pub fn register(&mut self, module: ModuleDefinition) -> &mut Self {
        self.modules.push(module);
        self
    }

    /// Append one module, adding `extra` after each route's own middleware.
    pub fn register_with(&mut self, mut module: ModuleDefinition, extra: &[Middleware]) -> &mut Self {
        for route in &mut module.routes {
            route.append_middlewares(extra);
        }
        self.register(module)
    }

    /// Append several modules in order.
    pub fn register_all(&mut self, modules: impl IntoIterator<Item = ModuleDefinition>) -> &mut Self {
        self.register_all_with(modules, &[])
    }

    /// [`register_all`](Self::register_all) with extra route middleware.
    pub fn register_all_with(
        &mut self,
        modules: impl IntoIterator<Item = ModuleDefinition>,
        extra: &[Middleware],
    ) -> &mut Self {
        for module in modules {
            self.register_with(module, extra);
        }
        self
    }

    /// Modules in mount order.
    pub fn modules(&self) -> &[ModuleDefinition] {
        &self.modules
    }

    /// Number of modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether no module is registered.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Total number of routes.
    pub fn route_count(&self) -> usize {
        self.modules.iter().map(|m| m.routes.len()).sum()
    }
}
