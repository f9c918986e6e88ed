//! # Application Builder
//!
//! [`App`] collects everything the dispatcher needs: configuration, modules,
//! error handlers, named middleware and the application context. `build`
//! produces the Axum router; `serve` binds it and runs until Ctrl-C or
//! SIGTERM.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use axum::Router;
use trellis_core::{AppContext, ConfigError, ConfigProvider, FrameworkConfig};

use crate::errors::{ErrorHandler, ErrorRegistry};
use crate::middleware::{self, Middleware, MiddlewareFn};
use crate::openapi::ApiInfo;
use crate::routing::{ModuleDefinition, ModuleRegistry};

/// Application under construction.
pub struct App {
    pub(crate) config: FrameworkConfig,
    pub(crate) modules: ModuleRegistry,
    pub(crate) errors: ErrorRegistry,
    pub(crate) middleware: HashMap<String, MiddlewareFn>,
    pub(crate) context: Option<Arc<AppContext>>,
    pub(crate) info: ApiInfo,
}

impl Default for App {
    fn default() -> Self {
        Self::new(FrameworkConfig::default())
    }
}

impl App {
    /// App over `config`. Default error handlers follow
    /// `config.default_error_handlers`.
    pub fn new(config: FrameworkConfig) -> Self {
        let mut errors = ErrorRegistry::new();
        errors.set_defaults(config.default_error_handlers);
        Self {
            config,
            modules: ModuleRegistry::new(),
            errors,
            middleware: HashMap::new(),
            context: None,
            info: ApiInfo::default(),
        }
    }

    /// App configured from `provider`.
    pub fn from_provider(provider: &dyn ConfigProvider) -> Result<Self, ConfigError> {
        FrameworkConfig::from_provider(provider).map(Self::new)
    }

    /// Active configuration.
    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    /// Registered modules.
    pub fn registry(&self) -> &ModuleRegistry {
        &self.modules
    }

    /// The error handler chain, for direct edits.
    pub fn error_registry_mut(&mut self) -> &mut ErrorRegistry {
        &mut self.errors
    }

    /// Register a module.
    pub fn module(mut self, module: ModuleDefinition) -> Self {
        self.modules.register(module);
        self
    }

    /// Register several modules in order.
    pub fn modules(mut self, modules: impl IntoIterator<Item = ModuleDefinition>) -> Self {
        self.modules.register_all(modules);
        self
    }

    /// Register several modules, appending `extra` to every route's middleware.
    pub fn modules_with(
        mut self,
        modules: impl IntoIterator<Item = ModuleDefinition>,
        extra: &[Middleware],
    ) -> Self {
        self.modules.register_all_with(modules, extra);
        self
    }

    /// Register a project error handler, ahead of the defaults.
    pub fn error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.errors.register(handler);
        self
    }

    /// Turn the default error handlers on or off.
    pub fn default_error_handlers(mut self, enabled: bool) -> Self {
        self.errors.set_defaults(enabled);
        self
    }

    /// Register middleware referenced by name from modules and routes.
    pub fn middleware<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.middleware.insert(name.into(), middleware::erase(f));
        self
    }

    /// Share `context` with handlers through the request extensions.
    pub fn context(mut self, context: Arc<AppContext>) -> Self {
        self.context = Some(context);
        self
    }

    /// Set the OpenAPI title, version and description.
    pub fn api_info(mut self, info: ApiInfo) -> Self {
        self.info = info;
        self
    }

    /// Build the router.
    pub fn build(&self) -> Router {
        crate::dispatch::build(self)
    }

    /// Bind `host:port` and serve until a shutdown signal arrives.
    pub async fn serve(self) -> anyhow::Result<()> {
        let router = self.build();
        let listener = tokio::net::TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        tracing::info!(
            addr = %listener.local_addr()?,
            prefix = %self.config.api_prefix,
            modules = self.modules.len(),
            routes = self.modules.route_count(),
            "listening"
        );
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        tracing::info!("server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "SIGTERM handler unavailable; waiting for Ctrl-C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("shutdown signal received");
}
