//! In-memory graph engine for testing.

use crate::error::{EngineError, EngineResult};
use crate::traits::{GraphEngine, PhysicalTransaction, TxOutcome};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// A pending write buffered inside an open transaction.
#[derive(Debug, Clone)]
enum PendingWrite {
    /// Insert or replace an object payload.
    Put(Vec<u8>),
    /// Remove an object.
    Delete,
}

/// An in-memory graph engine.
///
/// Objects are opaque payloads keyed by UUID; interpretation belongs
/// to the layer above. The engine is suitable for:
/// - Unit and integration tests
/// - Ephemeral databases that don't need persistence
///
/// # Thread Safety
///
/// The engine can be shared across threads; each transaction buffers
/// its writes privately and applies them on a successful finish.
///
/// # Example
///
/// ```rust
/// use vergedb_engine::{InMemoryEngine, PhysicalTransaction, TxOutcome};
/// use uuid::Uuid;
///
/// let engine = InMemoryEngine::new();
/// let id = Uuid::new_v4();
///
/// let mut tx = engine.begin_memory();
/// tx.put(id, vec![1, 2, 3]).unwrap();
/// tx.mark_success().unwrap();
/// assert_eq!(tx.finish().unwrap(), TxOutcome::Committed);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    objects: Arc<RwLock<HashMap<Uuid, Vec<u8>>>>,
}

impl InMemoryEngine {
    /// Creates a new empty engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins a transaction with the concrete handle type.
    ///
    /// Useful in tests that need the data-plane methods of
    /// [`MemoryTransaction`]; the [`GraphEngine`] impl returns the
    /// same handle boxed.
    #[must_use]
    pub fn begin_memory(&self) -> MemoryTransaction {
        MemoryTransaction {
            objects: Arc::clone(&self.objects),
            pending: HashMap::new(),
            depth: 1,
            success: false,
            failure: false,
            finished: false,
        }
    }

    /// Reads a committed object payload.
    #[must_use]
    pub fn get(&self, id: &Uuid) -> Option<Vec<u8>> {
        self.objects.read().get(id).cloned()
    }

    /// Returns the number of committed objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Whether the engine holds no committed objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

impl GraphEngine for InMemoryEngine {
    fn begin_transaction(&self) -> EngineResult<Box<dyn PhysicalTransaction>> {
        Ok(Box::new(self.begin_memory()))
    }
}

/// An open transaction on an [`InMemoryEngine`].
///
/// Writes are buffered until `finish`. Reads check the pending buffer
/// first, so a same-transaction reader observes its own uncommitted
/// puts and deletes before commit.
#[derive(Debug)]
pub struct MemoryTransaction {
    objects: Arc<RwLock<HashMap<Uuid, Vec<u8>>>>,
    pending: HashMap<Uuid, PendingWrite>,
    depth: usize,
    success: bool,
    failure: bool,
    finished: bool,
}

impl MemoryTransaction {
    /// Buffers an insert or replace of an object payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is closed.
    pub fn put(&mut self, id: Uuid, payload: Vec<u8>) -> EngineResult<()> {
        self.ensure_open()?;
        self.pending.insert(id, PendingWrite::Put(payload));
        Ok(())
    }

    /// Buffers a deletion of an object.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is closed.
    pub fn delete(&mut self, id: Uuid) -> EngineResult<()> {
        self.ensure_open()?;
        self.pending.insert(id, PendingWrite::Delete);
        Ok(())
    }

    /// Reads an object, observing this transaction's pending writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is closed.
    pub fn get(&self, id: &Uuid) -> EngineResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        if let Some(write) = self.pending.get(id) {
            return Ok(match write {
                PendingWrite::Put(payload) => Some(payload.clone()),
                PendingWrite::Delete => None,
            });
        }
        Ok(self.objects.read().get(id).cloned())
    }

    /// Returns the number of buffered writes.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if self.finished {
            Err(EngineError::TransactionClosed)
        } else {
            Ok(())
        }
    }
}

impl PhysicalTransaction for MemoryTransaction {
    fn nested_begin(&mut self) -> EngineResult<()> {
        self.ensure_open()?;
        self.depth += 1;
        Ok(())
    }

    fn nested_end(&mut self) -> EngineResult<()> {
        self.ensure_open()?;
        if self.depth <= 1 {
            return Err(EngineError::invalid_operation(
                "nested_end would drop below the top-level transaction",
            ));
        }
        self.depth -= 1;
        Ok(())
    }

    fn mark_success(&mut self) -> EngineResult<()> {
        self.ensure_open()?;
        self.success = true;
        Ok(())
    }

    fn mark_failure(&mut self) -> EngineResult<()> {
        self.ensure_open()?;
        self.failure = true;
        Ok(())
    }

    fn finish(&mut self) -> EngineResult<TxOutcome> {
        self.ensure_open()?;
        self.finished = true;

        if self.success && !self.failure {
            let mut objects = self.objects.write();
            for (id, write) in self.pending.drain() {
                match write {
                    PendingWrite::Put(payload) => {
                        objects.insert(id, payload);
                    }
                    PendingWrite::Delete => {
                        objects.remove(&id);
                    }
                }
            }
            Ok(TxOutcome::Committed)
        } else {
            self.pending.clear();
            Ok(TxOutcome::RolledBack)
        }
    }

    fn is_successful(&self) -> bool {
        self.success && !self.failure
    }

    fn depth(&self) -> usize {
        self.depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_engine_is_empty() {
        let engine = InMemoryEngine::new();
        assert!(engine.is_empty());
        assert_eq!(engine.len(), 0);
    }

    #[test]
    fn commit_applies_pending_writes() {
        let engine = InMemoryEngine::new();
        let id = Uuid::new_v4();

        let mut tx = engine.begin_memory();
        tx.put(id, vec![1, 2, 3]).unwrap();
        tx.mark_success().unwrap();
        assert_eq!(tx.finish().unwrap(), TxOutcome::Committed);

        assert_eq!(engine.get(&id), Some(vec![1, 2, 3]));
    }

    #[test]
    fn finish_without_success_rolls_back() {
        let engine = InMemoryEngine::new();
        let id = Uuid::new_v4();

        let mut tx = engine.begin_memory();
        tx.put(id, vec![1]).unwrap();
        assert_eq!(tx.finish().unwrap(), TxOutcome::RolledBack);

        assert!(engine.get(&id).is_none());
    }

    #[test]
    fn failure_flag_wins_over_success() {
        let engine = InMemoryEngine::new();
        let id = Uuid::new_v4();

        let mut tx = engine.begin_memory();
        tx.put(id, vec![1]).unwrap();
        tx.mark_success().unwrap();
        tx.mark_failure().unwrap();
        assert!(!tx.is_successful());
        assert_eq!(tx.finish().unwrap(), TxOutcome::RolledBack);

        assert!(engine.get(&id).is_none());
    }

    #[test]
    fn reads_see_own_pending_put() {
        let engine = InMemoryEngine::new();
        let id = Uuid::new_v4();

        let mut tx = engine.begin_memory();
        tx.put(id, vec![42]).unwrap();
        assert_eq!(tx.get(&id).unwrap(), Some(vec![42]));
    }

    #[test]
    fn reads_see_own_pending_delete() {
        let engine = InMemoryEngine::new();
        let id = Uuid::new_v4();

        // Commit an object first.
        let mut tx = engine.begin_memory();
        tx.put(id, vec![1]).unwrap();
        tx.mark_success().unwrap();
        tx.finish().unwrap();

        // Delete it and read back within the same open transaction.
        let mut tx = engine.begin_memory();
        tx.delete(id).unwrap();
        assert_eq!(tx.get(&id).unwrap(), None);

        // Still committed for everyone else until finish.
        assert_eq!(engine.get(&id), Some(vec![1]));
    }

    #[test]
    fn nested_begin_and_end_track_depth() {
        let engine = InMemoryEngine::new();
        let mut tx = engine.begin_memory();
        assert_eq!(tx.depth(), 1);

        tx.nested_begin().unwrap();
        tx.nested_begin().unwrap();
        assert_eq!(tx.depth(), 3);

        tx.nested_end().unwrap();
        assert_eq!(tx.depth(), 2);
    }

    #[test]
    fn nested_end_below_top_level_fails() {
        let engine = InMemoryEngine::new();
        let mut tx = engine.begin_memory();

        let result = tx.nested_end();
        assert!(matches!(result, Err(EngineError::InvalidOperation { .. })));
    }

    #[test]
    fn operations_fail_after_finish() {
        let engine = InMemoryEngine::new();
        let mut tx = engine.begin_memory();
        tx.finish().unwrap();

        assert!(matches!(
            tx.put(Uuid::new_v4(), vec![]),
            Err(EngineError::TransactionClosed)
        ));
        assert!(matches!(tx.finish(), Err(EngineError::TransactionClosed)));
    }

    #[test]
    fn concurrent_transactions_do_not_see_each_other() {
        let engine = InMemoryEngine::new();
        let id = Uuid::new_v4();

        let mut writer = engine.begin_memory();
        writer.put(id, vec![7]).unwrap();

        let reader = engine.begin_memory();
        assert_eq!(reader.get(&id).unwrap(), None);

        writer.mark_success().unwrap();
        writer.finish().unwrap();
        assert_eq!(reader.get(&id).unwrap(), Some(vec![7]));
    }

    #[test]
    fn boxed_transaction_via_trait() {
        let engine = InMemoryEngine::new();
        let mut tx = engine.begin_transaction().unwrap();
        tx.mark_success().unwrap();
        assert_eq!(tx.finish().unwrap(), TxOutcome::Committed);
    }
}
