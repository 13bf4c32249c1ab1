//! Validator and post-processing hooks.

use crate::change_set::ChangeSet;
use crate::error::ErrorBuffer;
use crate::object::ObjectRef;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Per-entity validation hooks, registered by entity-type name.
///
/// The three methods map onto the commit pipeline:
/// - [`before_commit`] runs in phase 1, once per distinct touched
///   entity, and sees the whole change set - the place for business
///   rules that need transaction-wide context
/// - [`validate`] runs in phase 3 under the type locks - the place
///   for structural constraints (uniqueness, cardinality) that must
///   see a globally consistent view across concurrent transactions
/// - [`after_commit`] runs after the physical commit, outside any
///   lock
///
/// All methods have passing/no-op defaults so a validator only
/// implements the hooks it cares about.
///
/// [`before_commit`]: EntityValidator::before_commit
/// [`validate`]: EntityValidator::validate
/// [`after_commit`]: EntityValidator::after_commit
pub trait EntityValidator: Send + Sync {
    /// Phase-1 inner callback. Returns `false` to fail the
    /// transaction, appending detail to `errors`.
    fn before_commit(
        &self,
        _object: &ObjectRef,
        _changes: &ChangeSet,
        _errors: &mut ErrorBuffer,
    ) -> bool {
        true
    }

    /// Phase-3 validation, invoked while the type locks for the
    /// transaction's synchronization keys are held.
    fn validate(&self, _object: &ObjectRef, _errors: &mut ErrorBuffer) -> bool {
        true
    }

    /// Post-commit outer callback, invoked on the committed state
    /// outside any lock. Failures here cannot affect the transaction.
    fn after_commit(&self, _object: &ObjectRef) {}
}

/// Registry of validators keyed by entity-type name.
///
/// Multiple validators may be registered per type; they run in
/// registration order.
#[derive(Default)]
pub struct ValidatorRegistry {
    validators: RwLock<HashMap<String, Vec<Arc<dyn EntityValidator>>>>,
}

impl ValidatorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a validator for an entity type.
    pub fn register(&self, object_type: impl Into<String>, validator: Arc<dyn EntityValidator>) {
        self.validators
            .write()
            .entry(object_type.into())
            .or_default()
            .push(validator);
    }

    /// Returns the validators registered for an entity type, in
    /// registration order.
    #[must_use]
    pub fn validators_for(&self, object_type: &str) -> Vec<Arc<dyn EntityValidator>> {
        self.validators
            .read()
            .get(object_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of entity types with at least one validator.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.validators.read().len()
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("type_count", &self.type_count())
            .finish_non_exhaustive()
    }
}

/// A deduplicated post-commit action registered under a string key.
///
/// Actions run in phase 2 in key order; registering a second action
/// under the same key replaces the first, so repeated triggers
/// collapse into a single execution.
pub trait PostProcess: Send {
    /// Executes the action. Returns `false` to fail the transaction,
    /// appending detail to `errors`.
    fn run(&self, errors: &mut ErrorBuffer) -> bool;
}

impl<F> PostProcess for F
where
    F: Fn(&mut ErrorBuffer) -> bool + Send,
{
    fn run(&self, errors: &mut ErrorBuffer) -> bool {
        self(errors)
    }
}
