//! # Persistence Adapter
//!
//! Trellis does not talk to a database itself. Projects plug one in behind
//! [`DatabaseAdapter`], and services receive an opaque [`TransactionHandle`]
//! through `with_transaction`.
//!
//! [`MockDatabase`] is an in-memory implementation for tests and local
//! development; its transactions only record whether they were committed or
//! rolled back.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

/// Errors reported by adapters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// The transaction was already committed or rolled back.
    #[error("transaction {0} is already finished")]
    TransactionFinished(String),

    /// Backend-specific failure.
    #[error("database error: {0}")]
    Backend(String),
}

/// A unit of work opened by a [`DatabaseAdapter`].
#[async_trait]
pub trait Transaction: Send + Sync + fmt::Debug {
    /// Identifier, for logs.
    fn id(&self) -> &str;

    /// Make the transaction's writes durable.
    async fn commit(&self) -> Result<(), AdapterError>;

    /// Discard the transaction's writes.
    async fn rollback(&self) -> Result<(), AdapterError>;
}

/// Shared handle to an open transaction.
pub type TransactionHandle = Arc<dyn Transaction>;

/// Connection to the project's persistence layer.
#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    /// Bring the schema up to date. No-op unless overridden.
    async fn sync(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    /// Release connections. No-op unless overridden.
    async fn close(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    /// Open a transaction.
    async fn begin(&self) -> Result<TransactionHandle, AdapterError>;

    /// Human-readable adapter name (e.g. "postgres", "mock").
    fn adapter_name(&self) -> &str;
}

/// Final state of a [`MockTransaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Neither committed nor rolled back.
    Open,
    /// `commit` succeeded.
    Committed,
    /// `rollback` succeeded.
    RolledBack,
}

/// Transaction that records what happened to it.
#[derive(Debug)]
pub struct MockTransaction {
    id: String,
    state: Mutex<TransactionState>,
}

impl MockTransaction {
    /// Open transaction with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: Mutex::new(TransactionState::Open),
        }
    }

    /// Current state.
    pub fn state(&self) -> TransactionState {
        *self.state.lock()
    }

    fn finish(&self, next: TransactionState) -> Result<(), AdapterError> {
        let mut state = self.state.lock();
        if *state != TransactionState::Open {
            return Err(AdapterError::TransactionFinished(self.id.clone()));
        }
        *state = next;
        Ok(())
    }
}

#[async_trait]
impl Transaction for MockTransaction {
    fn id(&self) -> &str {
        &self.id
    }

    async fn commit(&self) -> Result<(), AdapterError> {
        self.finish(TransactionState::Committed)
    }

    async fn rollback(&self) -> Result<(), AdapterError> {
        self.finish(TransactionState::RolledBack)
    }
}

/// In-memory adapter handing out [`MockTransaction`]s with ids `tx-1`, `tx-2`, ...
#[derive(Debug, Default)]
pub struct MockDatabase {
    next_id: AtomicU64,
}

impl MockDatabase {
    /// New adapter.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DatabaseAdapter for MockDatabase {
    async fn begin(&self) -> Result<TransactionHandle, AdapterError> {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(Arc::new(MockTransaction::new(format!("tx-{n}"))))
    }

    fn adapter_name(&self) -> &str {
        "mock"
    }
}
