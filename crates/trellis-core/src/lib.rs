#![deny(missing_docs)]

//! # trellis-core — Foundational Types for Trellis
//!
//! Leaf crate of the workspace: every other Trellis crate depends on it, and
//! it depends on nothing internal.
//!
//! - [`Envelope`] and [`ApiResponse`]: the uniform response body and the
//!   explicit-status success value a handler may return.
//! - [`ValidationResult`]: ordered validation messages, also raised as the
//!   error when a schema check fails.
//! - [`AppError`]: typed application exception carrying its HTTP status.
//! - [`FrameworkConfig`] and the [`ConfigProvider`] trait.
//! - [`AppContext`] and its single-initialization guard [`ContextSlot`].
//! - [`DatabaseAdapter`] / [`Transaction`]: the opaque persistence seam.
//!
//! ## Crate Policy
//!
//! - No `unsafe` code.
//! - No `.unwrap()` outside tests.

pub mod adapter;
pub mod config;
pub mod context;
pub mod envelope;
pub mod error;
pub mod validation;

pub use adapter::{
    AdapterError, DatabaseAdapter, MockDatabase, MockTransaction, Transaction, TransactionHandle,
    TransactionState,
};
pub use config::{ConfigProvider, EnvConfig, FrameworkConfig, LogFormat, MapConfig};
pub use context::{AppContext, ContextSlot};
pub use envelope::{ApiResponse, Envelope};
pub use error::{AppError, ConfigError, ContextError};
pub use validation::{ValidationCode, ValidationMessage, ValidationResult};
