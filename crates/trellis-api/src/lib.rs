#![deny(missing_docs)]

//! # trellis-api — Axum Integration for Trellis
//!
//! Controllers declare routes, modules group them under a prefix, and the
//! dispatcher mounts everything on one Axum [`Router`](axum::Router):
//!
//! ```no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use trellis_api::{create_module, App, HandlerResult, Reply, RequestContext};
//! use trellis_core::FrameworkConfig;
//!
//! struct HealthController;
//!
//! impl HealthController {
//!     async fn live(self: Arc<Self>, _req: RequestContext) -> HandlerResult {
//!         Ok(Reply::Data(json!({"status": "ok"})))
//!     }
//! }
//!
//! # async fn run() -> anyhow::Result<()> {
//! App::new(FrameworkConfig::default())
//!     .module(create_module("/health", HealthController, |r| vec![r.get("/live", HealthController::live)]))
//!     .serve()
//!     .await
//! # }
//! ```
//!
//! ## API Surface
//!
//! | Module        | Contents                                                  |
//! |---------------|-----------------------------------------------------------|
//! | [`app`]       | [`App`] builder, `build` and `serve`                      |
//! | [`routing`]   | Route and module definitions, controller binding         |
//! | [`dispatch`]  | Router assembly and per-request dispatch                  |
//! | [`errors`]    | [`ErrorHandler`] trait, [`ErrorRegistry`], defaults       |
//! | [`reply`]     | [`Reply`]: what handlers return                           |
//! | [`request`]   | [`RequestContext`]: what handlers receive                 |
//! | [`middleware`]| Named and inline middleware, request ids, HTTP tracing    |
//! | [`openapi`]   | Generated OpenAPI document                                |
//! | [`telemetry`] | `tracing` subscriber setup                                |
//!
//! ## Middleware Order
//!
//! Outermost first:
//!
//! 1. Panic catcher (panics become [`HandlerPanic`] and reach the registry).
//! 2. Request id (`x-request-id`, generated when absent).
//! 3. HTTP trace span, carrying that request id.
//! 4. CORS, when origins are configured.
//! 5. Application context extension, when set.
//! 6. Module middleware, in declaration order.
//! 7. Route middleware, in declaration order.
//! 8. The handler.

pub mod app;
pub mod dispatch;
pub mod errors;
pub mod middleware;
pub mod openapi;
pub mod reply;
pub mod request;
pub mod routing;
pub mod telemetry;

pub use app::App;
pub use dispatch::{join_path, route_table, HandlerPanic};
pub use errors::{ErrorHandler, ErrorRegistry};
pub use middleware::Middleware;
pub use openapi::ApiInfo;
pub use reply::{HandlerResult, Reply};
pub use request::{MalformedBody, RequestContext, RequestInfo};
pub use routing::{
    bind_controller, create_module, create_module_with, Binder, HttpMethod, ModuleDefinition, ModuleOptions,
    ModuleRegistry, RouteDefinition,
};
pub use trellis_core::{ApiResponse, AppError};
