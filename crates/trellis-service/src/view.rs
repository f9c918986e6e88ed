//! # Derived Views
//!
//! [`Configurable`] is implemented by each service with two accessors; the
//! provided methods derive views and read the active configuration.

use serde_json::{Map, Value};
use trellis_core::TransactionHandle;

use crate::config::{ConfigPatch, ServiceConfig};

/// A service whose behavior is driven by a [`ServiceConfig`].
///
/// `Clone` must be a shallow copy of the service's data: shared stores and
/// clients go behind `Arc` so a view reads and writes the same state as the
/// instance it was derived from.
pub trait Configurable: Clone {
    /// Active configuration.
    fn service_config(&self) -> &ServiceConfig;

    /// Active configuration, mutably.
    fn service_config_mut(&mut self) -> &mut ServiceConfig;

    /// Update this instance's configuration in place.
    fn configure(&mut self, patch: ConfigPatch) -> &mut Self {
        self.service_config_mut().apply(patch);
        self
    }

    /// View whose intercepted operations swallow failures.
    fn silent(&self) -> Self {
        derive(self, |config| config.throw_on_error = false)
    }

    /// View bound to `transaction`.
    fn with_transaction(&self, transaction: TransactionHandle) -> Self {
        derive(self, |config| config.transaction = Some(transaction))
    }

    /// View with `extra` merged over the current context.
    fn with_context(&self, extra: Map<String, Value>) -> Self {
        derive(self, |config| config.context.extend(extra))
    }

    /// Whether failures propagate.
    fn throws(&self) -> bool {
        self.service_config().throw_on_error
    }

    /// Bound transaction, if any.
    fn transaction(&self) -> Option<&TransactionHandle> {
        self.service_config().transaction.as_ref()
    }

    /// One context value.
    fn context_value(&self, key: &str) -> Option<&Value> {
        self.service_config().context.get(key)
    }
}

fn derive<S, F>(service: &S, edit: F) -> S
where
    S: Configurable,
    F: FnOnce(&mut ServiceConfig),
{
    let mut view = service.clone();
    edit(view.service_config_mut());
    view
}
