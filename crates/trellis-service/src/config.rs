//! # Service Configuration
//!
//! [`ServiceConfig`] is the per-view policy: whether failures propagate, the
//! bound transaction, and free-form context. Its `run` helpers are the
//! interception point every public service operation goes through.

use std::fmt;
use std::future::Future;

use serde_json::{Map, Value};
use trellis_core::TransactionHandle;

/// Error policy, transaction and context of one service view.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// When false, failures of intercepted operations become `Ok(None)`.
    pub throw_on_error: bool,
    /// Transaction bound with `with_transaction`.
    pub transaction: Option<TransactionHandle>,
    /// Context merged by `with_context`.
    pub context: Map<String, Value>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            throw_on_error: true,
            transaction: None,
            context: Map::new(),
        }
    }
}

impl ServiceConfig {
    /// Apply `patch` in place.
    pub fn apply(&mut self, patch: ConfigPatch) {
        if let Some(throw_on_error) = patch.throw_on_error {
            self.throw_on_error = throw_on_error;
        }
        if let Some(transaction) = patch.transaction {
            self.transaction = Some(transaction);
        }
        self.context.extend(patch.context);
    }

    /// Run a synchronous operation under this view's error policy.
    ///
    /// Success is `Ok(Some(value))`. A failure propagates unchanged when
    /// `throw_on_error` is set and becomes `Ok(None)` otherwise.
    pub fn run<T, E, F>(&self, operation: &str, f: F) -> Result<Option<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: fmt::Display,
    {
        self.settle(operation, f())
    }

    /// Async counterpart of [`run`](Self::run). The policy applies to the
    /// future's eventual failure; success passes through.
    pub async fn run_async<T, E, Fut>(&self, operation: &str, fut: Fut) -> Result<Option<T>, E>
    where
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.settle(operation, fut.await)
    }

    fn settle<T, E: fmt::Display>(&self, operation: &str, result: Result<T, E>) -> Result<Option<T>, E> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if self.throw_on_error => Err(err),
            Err(err) => {
                tracing::debug!(operation, error = %err, "silent service view swallowed error");
                Ok(None)
            }
        }
    }
}

/// Partial update for [`Configurable::configure`](crate::Configurable::configure).
///
/// Unset fields leave the current value alone; context entries are merged.
#[derive(Debug, Clone, Default)]
pub struct ConfigPatch {
    /// New error policy.
    pub throw_on_error: Option<bool>,
    /// New bound transaction.
    pub transaction: Option<TransactionHandle>,
    /// Context entries to merge.
    pub context: Map<String, Value>,
}

impl ConfigPatch {
    /// Empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the error policy.
    pub fn throw_on_error(mut self, throw_on_error: bool) -> Self {
        self.throw_on_error = Some(throw_on_error);
        self
    }

    /// Bind a transaction.
    pub fn transaction(mut self, transaction: TransactionHandle) -> Self {
        self.transaction = Some(transaction);
        self
    }

    /// Merge one context entry.
    pub fn context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}
