//! Transaction manager configuration.

use std::time::Duration;

/// Configuration for a [`TransactionManager`].
///
/// [`TransactionManager`]: crate::TransactionManager
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Upper bound on phase-3 type-lock acquisition. `None` blocks
    /// until the locks are free.
    ///
    /// A timed-out acquisition cancels the transaction
    /// ([`TxError::LockCancelled`]) without raising a validation
    /// error; no partial lock set is ever retained.
    ///
    /// [`TxError::LockCancelled`]: crate::TxError::LockCancelled
    pub lock_timeout: Option<Duration>,
}

impl Config {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the type-lock acquisition timeout.
    #[must_use]
    pub const fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }
}
