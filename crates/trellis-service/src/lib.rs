#![deny(missing_docs)]

//! # trellis-service — Configurable Service Views
//!
//! A service is an ordinary struct holding shared data (usually behind
//! `Arc`) plus a [`ServiceConfig`]. Implementing [`Configurable`] gives it
//! derived views:
//!
//! - `silent()`: failures of public operations become `Ok(None)`.
//! - `with_transaction(tx)`: operations see the bound transaction handle.
//! - `with_context(extra)`: operations see merged context values.
//!
//! Deriving a view clones the service and edits the clone's config; the base
//! instance and earlier views are never touched. Public operations route
//! their body through [`ServiceConfig::run`] or [`ServiceConfig::run_async`],
//! which apply the error policy. Private helpers call each other directly
//! and always propagate.
//!
//! ```
//! use trellis_core::AppError;
//! use trellis_service::{Configurable, ServiceConfig};
//!
//! #[derive(Clone, Default)]
//! struct Greeter {
//!     config: ServiceConfig,
//! }
//!
//! impl Configurable for Greeter {
//!     fn service_config(&self) -> &ServiceConfig {
//!         &self.config
//!     }
//!     fn service_config_mut(&mut self) -> &mut ServiceConfig {
//!         &mut self.config
//!     }
//! }
//!
//! impl Greeter {
//!     pub fn greet(&self, name: &str) -> Result<Option<String>, AppError> {
//!         self.config.run("greet", || {
//!             if name.is_empty() {
//!                 return Err(AppError::BadRequest("name is empty".into()));
//!             }
//!             Ok(format!("hello {name}"))
//!         })
//!     }
//! }
//!
//! let greeter = Greeter::default();
//! assert!(greeter.greet("").is_err());
//! assert_eq!(greeter.silent().greet("").unwrap(), None);
//! ```

pub mod config;
pub mod view;

pub use config::{ConfigPatch, ServiceConfig};
pub use view::Configurable;
