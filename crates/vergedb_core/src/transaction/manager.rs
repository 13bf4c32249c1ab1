//! Transaction manager.

use crate::config::Config;
use crate::error::TxResult;
use crate::listener::{ListenerRegistry, TransactionListener};
use crate::locks::TypeLockRegistry;
use crate::transaction::context::TransactionContext;
use crate::types::TransactionId;
use crate::validate::{EntityValidator, ValidatorRegistry};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use vergedb_engine::GraphEngine;

/// Owns the process-wide collaborators of the transaction pipeline
/// and hands out per-transaction contexts.
///
/// The manager holds:
/// - the physical [`GraphEngine`]
/// - the per-type [`ValidatorRegistry`] invoked by the commit phases
/// - the [`TypeLockRegistry`] serializing phase 3 across transactions
///   with overlapping type sets
/// - the [`ListenerRegistry`] notified after successful commits
///
/// Each call to [`begin`] opens one physical transaction and returns
/// a [`TransactionContext`] bound to it. Contexts are explicit
/// handles: callers pass them (or a `&mut` borrow) down to whatever
/// code records changes. Nesting happens on the context, not here -
/// a nested logical `begin` increments the context's depth rather
/// than opening a second physical transaction.
///
/// [`begin`]: TransactionManager::begin
pub struct TransactionManager {
    engine: Arc<dyn GraphEngine>,
    validators: ValidatorRegistry,
    locks: TypeLockRegistry,
    listeners: ListenerRegistry,
    config: Config,
    next_txid: AtomicU64,
    active: AtomicUsize,
}

impl TransactionManager {
    /// Creates a manager with default configuration.
    #[must_use]
    pub fn new(engine: Arc<dyn GraphEngine>) -> Self {
        Self::with_config(engine, Config::default())
    }

    /// Creates a manager with the given configuration.
    #[must_use]
    pub fn with_config(engine: Arc<dyn GraphEngine>, config: Config) -> Self {
        Self {
            engine,
            validators: ValidatorRegistry::new(),
            locks: TypeLockRegistry::new(),
            listeners: ListenerRegistry::new(),
            config,
            next_txid: AtomicU64::new(1),
            active: AtomicUsize::new(0),
        }
    }

    /// Begins a top-level transaction.
    ///
    /// Opens a physical transaction on the engine and returns a fresh
    /// context at nesting depth 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot open a transaction.
    pub fn begin(&self) -> TxResult<TransactionContext<'_>> {
        let physical = self.engine.begin_transaction()?;
        let id = TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst));
        self.active.fetch_add(1, Ordering::SeqCst);
        Ok(TransactionContext::new(self, id, physical))
    }

    /// Registers a validator for an entity type.
    pub fn register_validator(
        &self,
        object_type: impl Into<String>,
        validator: Arc<dyn EntityValidator>,
    ) {
        self.validators.register(object_type, validator);
    }

    /// Registers a post-commit transaction listener.
    pub fn register_listener(&self, listener: Arc<dyn TransactionListener>) {
        self.listeners.register(listener);
    }

    /// Unregisters a transaction listener by identity.
    pub fn unregister_listener(&self, listener: &Arc<dyn TransactionListener>) {
        self.listeners.unregister(listener);
    }

    /// Number of currently active transaction contexts.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub(crate) fn validators(&self) -> &ValidatorRegistry {
        &self.validators
    }

    pub(crate) fn locks(&self) -> &TypeLockRegistry {
        &self.locks
    }

    pub(crate) fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn context_closed(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionManager")
            .field("active_count", &self.active_count())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}
