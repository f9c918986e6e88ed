//! # Application Context
//!
//! [`AppContext`] is the ambient state shared by controllers and services:
//! the configuration provider, named plugins, and a key → JSON value store.
//! It is constructed once at startup and handed to whatever needs it as an
//! `Arc<AppContext>`.
//!
//! [`ContextSlot`] is the explicit single-initialization guard for code that
//! needs one process-wide context: a second `init` fails instead of silently
//! replacing the first.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use serde_json::Value;

use crate::config::ConfigProvider;
use crate::error::ContextError;

type Plugin = Arc<dyn Any + Send + Sync>;

/// Shared application state.
///
/// Locks are `parking_lot` and are never held across `.await`.
pub struct AppContext {
    config: Arc<dyn ConfigProvider>,
    plugins: RwLock<HashMap<String, Plugin>>,
    state: RwLock<HashMap<String, Value>>,
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut plugins: Vec<String> = self.plugins.read().keys().cloned().collect();
        plugins.sort();
        f.debug_struct("AppContext")
            .field("plugins", &plugins)
            .field("state_keys", &self.state.read().len())
            .finish()
    }
}

impl AppContext {
    /// Create a context reading configuration from `config`.
    pub fn new(config: Arc<dyn ConfigProvider>) -> Self {
        Self {
            config,
            plugins: RwLock::new(HashMap::new()),
            state: RwLock::new(HashMap::new()),
        }
    }

    /// The configuration provider.
    pub fn config(&self) -> &dyn ConfigProvider {
        self.config.as_ref()
    }

    /// Register a plugin under `name`.
    ///
    /// # Errors
    ///
    /// [`ContextError::DuplicatePlugin`] if the name is taken.
    pub fn register_plugin<T>(&self, name: impl Into<String>, plugin: Arc<T>) -> Result<(), ContextError>
    where
        T: Any + Send + Sync,
    {
        let name = name.into();
        let mut plugins = self.plugins.write();
        if plugins.contains_key(&name) {
            return Err(ContextError::DuplicatePlugin(name));
        }
        tracing::debug!(plugin = %name, "plugin registered");
        plugins.insert(name, plugin);
        Ok(())
    }

    /// Look up a plugin by name and type. Returns `None` when the name is
    /// unknown or registered with a different type.
    pub fn plugin<T>(&self, name: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let plugin = self.plugins.read().get(name).cloned()?;
        plugin.downcast::<T>().ok()
    }

    /// Whether a plugin is registered under `name`.
    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.read().contains_key(name)
    }

    /// Store a value, returning the previous one.
    pub fn set_state(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.state.write().insert(key.into(), value)
    }

    /// Read a value.
    pub fn state(&self, key: &str) -> Option<Value> {
        self.state.read().get(key).cloned()
    }

    /// Remove a value.
    pub fn remove_state(&self, key: &str) -> Option<Value> {
        self.state.write().remove(key)
    }
}

/// Holds at most one [`AppContext`] for its whole lifetime.
#[derive(Debug, Default)]
pub struct ContextSlot {
    inner: OnceLock<Arc<AppContext>>,
}

impl ContextSlot {
    /// Empty slot. `const` so it can back a `static`.
    pub const fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    /// Store the context.
    ///
    /// # Errors
    ///
    /// [`ContextError::AlreadyInitialized`] on every call after the first.
    pub fn init(&self, context: AppContext) -> Result<Arc<AppContext>, ContextError> {
        let context = Arc::new(context);
        self.inner
            .set(Arc::clone(&context))
            .map_err(|_| ContextError::AlreadyInitialized)?;
        Ok(context)
    }

    /// The stored context.
    ///
    /// # Errors
    ///
    /// [`ContextError::NotInitialized`] before `init`.
    pub fn get(&self) -> Result<Arc<AppContext>, ContextError> {
        self.inner.get().cloned().ok_or(ContextError::NotInitialized)
    }

    /// Whether `init` has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.inner.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfig;
    use serde_json::json;

    fn context() -> AppContext {
        AppContext::new(Arc::new(MapConfig::new().set("APP_NAME", "demo")))
    }

    #[derive(Debug, PartialEq)]
    struct Mailer {
        from: String,
    }

    #[test]
    fn slot_initializes_exactly_once() {
        let slot = ContextSlot::new();
        assert_eq!(slot.get().unwrap_err(), ContextError::NotInitialized);
        assert!(!slot.is_initialized());

        slot.init(context()).unwrap();
        assert!(slot.is_initialized());
        assert_eq!(slot.init(context()).unwrap_err(), ContextError::AlreadyInitialized);
        assert_eq!(slot.get().unwrap().config().get("APP_NAME").as_deref(), Some("demo"));
    }

    #[test]
    fn plugins_are_looked_up_by_name_and_type() {
        let ctx = context();
        ctx.register_plugin("mailer", Arc::new(Mailer { from: "noreply".into() }))
            .unwrap();

        let mailer = ctx.plugin::<Mailer>("mailer").unwrap();
        assert_eq!(mailer.from, "noreply");
        assert!(ctx.plugin::<String>("mailer").is_none());
        assert!(ctx.plugin::<Mailer>("missing").is_none());
        assert!(ctx.has_plugin("mailer"));
    }

    #[test]
    fn duplicate_plugin_is_rejected() {
        let ctx = context();
        ctx.register_plugin("mailer", Arc::new(1_u8)).unwrap();
        assert_eq!(
            ctx.register_plugin("mailer", Arc::new(2_u8)).unwrap_err(),
            ContextError::DuplicatePlugin("mailer".into())
        );
    }

    #[test]
    fn state_round_trips() {
        let ctx = context();
        assert_eq!(ctx.set_state("boot", json!(1)), None);
        assert_eq!(ctx.set_state("boot", json!(2)), Some(json!(1)));
        assert_eq!(ctx.state("boot"), Some(json!(2)));
        assert_eq!(ctx.remove_state("boot"), Some(json!(2)));
        assert_eq!(ctx.state("boot"), None);
    }
}
