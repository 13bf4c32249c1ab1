//! Identifier for logical transactions.

use std::fmt;

/// Identity of one logical transaction.
///
/// Assigned by the manager from an incrementing counter, so IDs
/// double as a begin-order timestamp: a lower ID always began earlier.
/// The ID names the logical transaction in log output; it carries no
/// commit-order meaning, since transactions may finish out of begin
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Wraps a raw counter value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw counter value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}
