//! Graph engine trait definitions.

use crate::error::EngineResult;

/// Outcome of physically finishing a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    /// The transaction was committed.
    Committed,
    /// The transaction was rolled back.
    RolledBack,
}

/// A handle to one physical store transaction.
///
/// The handle mirrors the logical nesting of the layer above 1:1:
/// every nested logical `begin` calls [`nested_begin`], every nested
/// logical `finish` calls [`nested_end`], and only the outermost
/// caller invokes [`finish`].
///
/// # Invariants
///
/// - The handle starts at depth 1; `nested_end` below depth 1 is an
///   error
/// - `finish` commits iff `mark_success` was called and `mark_failure`
///   was not; failure wins when both flags are set
/// - After `finish`, every operation fails with
///   [`crate::EngineError::TransactionClosed`]
///
/// [`nested_begin`]: PhysicalTransaction::nested_begin
/// [`nested_end`]: PhysicalTransaction::nested_end
/// [`finish`]: PhysicalTransaction::finish
pub trait PhysicalTransaction: Send {
    /// Increments the nesting depth.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is closed.
    fn nested_begin(&mut self) -> EngineResult<()>;

    /// Decrements the nesting depth.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is closed or already at
    /// depth 1.
    fn nested_end(&mut self) -> EngineResult<()>;

    /// Flags the transaction for commit.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is closed or the engine
    /// rejects the flag.
    fn mark_success(&mut self) -> EngineResult<()>;

    /// Flags the transaction for rollback. Overrides a prior
    /// `mark_success`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is closed or the engine
    /// rejects the flag.
    fn mark_failure(&mut self) -> EngineResult<()>;

    /// Finishes the transaction: commits if flagged successful,
    /// rolls back otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is already closed or the
    /// engine fails to apply or discard the pending writes.
    fn finish(&mut self) -> EngineResult<TxOutcome>;

    /// Whether the transaction is currently flagged for commit.
    fn is_successful(&self) -> bool;

    /// Current nesting depth.
    fn depth(&self) -> usize;
}

/// A physical graph store that can open transactions.
///
/// Implementors must be `Send + Sync`: a single engine is shared by
/// all concurrently running transactions.
pub trait GraphEngine: Send + Sync {
    /// Opens a new physical transaction at depth 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot open a transaction.
    fn begin_transaction(&self) -> EngineResult<Box<dyn PhysicalTransaction>>;
}
