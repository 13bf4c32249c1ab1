//! Per-transaction context: nesting, recording, commit and finish.

use crate::error::{ErrorBuffer, TxError, TxResult};
use crate::object::{ObjectRef, PropertyValue};
use crate::queue::ValidationQueue;
use crate::transaction::manager::TransactionManager;
use crate::types::TransactionId;
use crate::validate::PostProcess;
use tracing::{error, warn};
use vergedb_engine::{PhysicalTransaction, TxOutcome};

/// Handle for one logical transaction, bound to one physical engine
/// transaction for its lifetime.
///
/// The context is an explicit handle: code that records changes
/// receives a `&mut TransactionContext` instead of consulting a
/// thread-local registry. Nested logical transactions increment the
/// depth of the same context; only the outermost level runs
/// validation, physically commits and notifies listeners.
///
/// The expected call shape around an operation is:
///
/// ```rust,ignore
/// let mut tx = manager.begin()?;
/// // ... entity operations record into the context ...
/// tx.commit()?;
/// tx.finish()?;
/// ```
///
/// `commit` runs the three-phase validation protocol and flags the
/// physical transaction; `finish` performs the physical commit or
/// rollback and, on success, notifies listeners. A context dropped
/// while still active is rolled back.
pub struct TransactionContext<'a> {
    manager: &'a TransactionManager,
    id: TransactionId,
    physical: Box<dyn PhysicalTransaction>,
    depth: usize,
    queue: ValidationQueue,
    errors: ErrorBuffer,
    active: bool,
}

impl<'a> TransactionContext<'a> {
    pub(crate) fn new(
        manager: &'a TransactionManager,
        id: TransactionId,
        physical: Box<dyn PhysicalTransaction>,
    ) -> Self {
        Self {
            manager,
            id,
            physical,
            depth: 1,
            queue: ValidationQueue::new(),
            errors: ErrorBuffer::new(),
            active: true,
        }
    }

    /// The logical transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Current nesting depth (≥ 1 while active).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Whether the top-level transaction has not yet finished.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether this context is at the outermost nesting level.
    #[must_use]
    pub fn is_toplevel(&self) -> bool {
        self.depth == 1
    }

    /// The change set accumulated so far.
    #[must_use]
    pub fn changes(&self) -> &crate::change_set::ChangeSet {
        self.queue.changes()
    }

    /// Enters a nested transaction level.
    ///
    /// Increments the depth and mirrors the nesting on the physical
    /// transaction. No new physical transaction is opened.
    ///
    /// # Errors
    ///
    /// Returns an error if the context has finished or the engine
    /// rejects the nested begin.
    pub fn begin(&mut self) -> TxResult<()> {
        self.ensure_active()?;
        self.physical.nested_begin()?;
        self.depth += 1;
        Ok(())
    }

    /// Commits with validation.
    ///
    /// # Errors
    ///
    /// See [`commit_with`](TransactionContext::commit_with).
    pub fn commit(&mut self) -> TxResult<()> {
        self.commit_with(true)
    }

    /// Runs the three-phase commit protocol.
    ///
    /// No-op unless the context is at nesting depth 1. When outermost:
    ///
    /// 1. Inner callbacks over every distinct touched entity (skipped
    ///    with `validate` false)
    /// 2. Deduplicated post-processing actions in key order (skipped
    ///    with `validate` false)
    /// 3. Validation under the type locks of the synchronization key
    ///    set; the locks are released on every path out of this phase
    ///
    /// On success the physical transaction is flagged successful;
    /// a failure while flagging is logged, not propagated, since the
    /// validation decision already stands. The physical commit itself
    /// happens in [`finish`](TransactionContext::finish).
    ///
    /// # Errors
    ///
    /// - [`TxError::ValidationFailed`] if phase 1, 2 or 3 rejected the
    ///   change set; the physical transaction is flagged failed but
    ///   not yet rolled back
    /// - [`TxError::LockCancelled`] if lock acquisition timed out; the
    ///   transaction is abandoned without a validation error and
    ///   success is never flagged
    /// - [`TxError::NotInTransaction`] if the context has finished
    pub fn commit_with(&mut self, validate: bool) -> TxResult<()> {
        self.ensure_active()?;
        if self.depth != 1 {
            return Ok(());
        }

        let manager = self.manager;

        // 1. Inner callbacks may reject the transaction before any
        // lock is taken.
        if validate && !self.queue.do_inner_callbacks(manager.validators(), &mut self.errors) {
            self.flag_failure();
            return Err(TxError::validation_failed(std::mem::take(&mut self.errors)));
        }

        // 2. Deduplicated post-processing actions.
        if validate && !self.queue.do_post_processing(&mut self.errors) {
            self.flag_failure();
            return Err(TxError::validation_failed(std::mem::take(&mut self.errors)));
        }

        // 3. Validation under the type locks for every touched type.
        let keys = self.queue.synchronization_keys();
        match manager.config().lock_timeout {
            Some(timeout) => {
                if !manager.locks().try_acquire_for(&keys, timeout) {
                    return Err(TxError::LockCancelled);
                }
            }
            None => manager.locks().acquire(&keys),
        }

        let valid = self
            .queue
            .do_validation(manager.validators(), &mut self.errors, validate);

        if !valid {
            self.flag_failure();
            manager.locks().release(&keys);
            return Err(TxError::validation_failed(std::mem::take(&mut self.errors)));
        }

        if let Err(err) = self.physical.mark_success() {
            error!(transaction = %self.id, error = %err, "failed to flag transaction success");
        }

        manager.locks().release(&keys);
        Ok(())
    }

    /// Finishes with post-commit callbacks enabled.
    ///
    /// # Errors
    ///
    /// See [`finish_with`](TransactionContext::finish_with).
    pub fn finish(&mut self) -> TxResult<Option<TxOutcome>> {
        self.finish_with(true)
    }

    /// Leaves a nesting level; at depth 1, tears the transaction down.
    ///
    /// At depth > 1 this only decrements the depth (mirrored on the
    /// physical transaction) and returns `None`. At depth 1 it
    /// physically finishes the underlying transaction - commit or
    /// rollback according to the success flag set by `commit` - and,
    /// only when the commit succeeded and `do_callbacks` is set, runs
    /// the outer callbacks and broadcasts the modification events to
    /// all registered listeners. The queue is cleared afterward in
    /// every case.
    ///
    /// Engine errors during the physical finish are logged and
    /// reported as a rollback, not propagated: the validation decision
    /// was already made.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::NotInTransaction`] if the context already
    /// finished, or an engine error from a nested end.
    pub fn finish_with(&mut self, do_callbacks: bool) -> TxResult<Option<TxOutcome>> {
        self.ensure_active()?;

        if self.depth > 1 {
            self.physical.nested_end()?;
            self.depth -= 1;
            return Ok(None);
        }

        self.active = false;
        let outcome = match self.physical.finish() {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(transaction = %self.id, error = %err, "physical finish failed");
                TxOutcome::RolledBack
            }
        };

        if do_callbacks && outcome == TxOutcome::Committed {
            self.queue.do_outer_callbacks(self.manager.validators());
            let events = self.queue.modification_events();
            self.manager.listeners().notify_all(&events);
        }

        self.queue.clear();
        self.manager.context_closed();
        Ok(Some(outcome))
    }

    /// Records a node creation.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::NotInTransaction`] on a finished context.
    pub fn node_created(&mut self, node: ObjectRef) -> TxResult<()> {
        self.ensure_active()?;
        self.queue.create(node);
        Ok(())
    }

    /// Records a node property modification with old/new snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::NotInTransaction`] on a finished context.
    pub fn node_modified(
        &mut self,
        node: ObjectRef,
        key: impl Into<String>,
        old: Option<PropertyValue>,
        new: Option<PropertyValue>,
    ) -> TxResult<()> {
        self.ensure_active()?;
        self.queue.modify(node, key, old, new);
        Ok(())
    }

    /// Records a node deletion.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::NotInTransaction`] on a finished context.
    pub fn node_deleted(&mut self, node: ObjectRef) -> TxResult<()> {
        self.ensure_active()?;
        self.queue.delete(node, false);
        Ok(())
    }

    /// Records a relationship creation.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::NotInTransaction`] on a finished context.
    pub fn relationship_created(&mut self, relationship: ObjectRef) -> TxResult<()> {
        self.ensure_active()?;
        self.queue.create(relationship);
        Ok(())
    }

    /// Records a relationship property modification.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::NotInTransaction`] on a finished context.
    pub fn relationship_modified(
        &mut self,
        relationship: ObjectRef,
        key: impl Into<String>,
        old: Option<PropertyValue>,
        new: Option<PropertyValue>,
    ) -> TxResult<()> {
        self.ensure_active()?;
        self.queue.modify(relationship, key, old, new);
        Ok(())
    }

    /// Records a relationship deletion.
    ///
    /// `passive` marks deletions that happen as a side effect of
    /// deleting an attached node, as opposed to a direct request.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::NotInTransaction`] on a finished context.
    pub fn relationship_deleted(&mut self, relationship: ObjectRef, passive: bool) -> TxResult<()> {
        self.ensure_active()?;
        self.queue.delete(relationship, passive);
        Ok(())
    }

    /// Registers a deduplicated post-processing action under `key`.
    ///
    /// Re-registering the same key replaces the prior action, so
    /// repeated triggers collapse into a single execution in phase 2.
    ///
    /// # Errors
    ///
    /// Returns [`TxError::NotInTransaction`] on a finished context.
    pub fn post_process(
        &mut self,
        key: impl Into<String>,
        action: Box<dyn PostProcess>,
    ) -> TxResult<()> {
        self.ensure_active()?;
        self.queue.post_process(key, action);
        Ok(())
    }

    fn ensure_active(&self) -> TxResult<()> {
        if self.active {
            Ok(())
        } else {
            Err(TxError::NotInTransaction)
        }
    }

    fn flag_failure(&mut self) {
        if let Err(err) = self.physical.mark_failure() {
            error!(transaction = %self.id, error = %err, "failed to flag transaction failure");
        }
    }
}

impl Drop for TransactionContext<'_> {
    fn drop(&mut self) {
        if self.active {
            warn!(transaction = %self.id, "transaction context dropped without finish, rolling back");
            self.active = false;
            self.flag_failure();
            if let Err(err) = self.physical.finish() {
                error!(transaction = %self.id, error = %err, "rollback of dropped transaction failed");
            }
            self.queue.clear();
            self.manager.context_closed();
        }
    }
}

impl std::fmt::Debug for TransactionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("id", &self.id)
            .field("depth", &self.depth)
            .field("active", &self.active)
            .field("changes", &self.queue.changes().len())
            .finish_non_exhaustive()
    }
}
