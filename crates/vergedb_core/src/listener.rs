//! Post-commit transaction listeners.

use crate::change_set::ModificationEvent;
use parking_lot::RwLock;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

/// Observer of successfully committed transactions.
///
/// Listeners are invoked synchronously, in registration order, with
/// the finalized modification events of one committed top-level
/// transaction. The events preserve the change set's insertion order.
pub trait TransactionListener: Send + Sync {
    /// Called exactly once per successfully committed and finished
    /// top-level transaction.
    fn transaction_committed(&self, events: &[ModificationEvent]);
}

/// Registry of transaction listeners.
///
/// The registry is owned by the [`TransactionManager`] and mutated
/// only via register/unregister; notification reads a snapshot of the
/// listener list, so listeners may unregister themselves from within
/// a callback.
///
/// [`TransactionManager`]: crate::TransactionManager
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<Vec<Arc<dyn TransactionListener>>>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener.
    pub fn register(&self, listener: Arc<dyn TransactionListener>) {
        self.listeners.write().push(listener);
    }

    /// Unregisters a listener by identity.
    pub fn unregister(&self, listener: &Arc<dyn TransactionListener>) {
        self.listeners
            .write()
            .retain(|existing| !Arc::ptr_eq(existing, listener));
    }

    /// Notifies all listeners, in registration order.
    ///
    /// A panicking listener is logged and skipped; listener failures
    /// can never retroactively fail the already-committed transaction
    /// or suppress later listeners.
    pub fn notify_all(&self, events: &[ModificationEvent]) {
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            let result =
                panic::catch_unwind(AssertUnwindSafe(|| listener.transaction_committed(events)));
            if result.is_err() {
                error!("transaction listener panicked during notification");
            }
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Whether no listeners are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
