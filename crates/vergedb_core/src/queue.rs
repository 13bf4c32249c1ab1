//! Validation queue: the three-phase commit protocol body.

use crate::change_set::{ChangeSet, ModificationEvent};
use crate::error::ErrorBuffer;
use crate::object::{ObjectRef, PropertyValue};
use crate::validate::{PostProcess, ValidatorRegistry};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Owns one transaction's change set and runs the commit phases over
/// it.
///
/// Phases run strictly in order; the context aborts the remaining
/// phases when one fails:
///
/// 1. Inner callbacks - once per distinct touched entity, before any
///    lock is taken
/// 2. Post-processing - deduplicated, key-ordered actions registered
///    via [`post_process`]
/// 3. Validation - per-entity structural validators, run by the
///    context while the type locks for the synchronization keys are
///    held
///
/// [`post_process`]: ValidationQueue::post_process
#[derive(Default)]
pub struct ValidationQueue {
    changes: ChangeSet,
    post_actions: BTreeMap<String, Box<dyn PostProcess>>,
}

impl ValidationQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an entity creation.
    pub fn create(&mut self, object: ObjectRef) {
        self.changes.create(object);
    }

    /// Records a property modification with old/new snapshots.
    pub fn modify(
        &mut self,
        object: ObjectRef,
        key: impl Into<String>,
        old: Option<PropertyValue>,
        new: Option<PropertyValue>,
    ) {
        self.changes.modify(object, key, old, new);
    }

    /// Records an entity deletion.
    pub fn delete(&mut self, object: ObjectRef, passive: bool) {
        self.changes.delete(object, passive);
    }

    /// Registers a post-processing action under `key`.
    ///
    /// Re-registering under an existing key replaces the prior action
    /// (last write wins), so an action triggered by many individual
    /// changes still runs exactly once.
    pub fn post_process(&mut self, key: impl Into<String>, action: Box<dyn PostProcess>) {
        self.post_actions.insert(key.into(), action);
    }

    /// The change set accumulated so far.
    #[must_use]
    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// The distinct entity-type names touched by this transaction.
    #[must_use]
    pub fn synchronization_keys(&self) -> BTreeSet<String> {
        self.changes.synchronization_keys()
    }

    /// Phase 1: runs `before_commit` on every validator of every
    /// distinct touched entity.
    ///
    /// All callbacks run to completion so the buffer accumulates every
    /// violation; returns `false` if any callback failed.
    pub fn do_inner_callbacks(
        &self,
        validators: &ValidatorRegistry,
        errors: &mut ErrorBuffer,
    ) -> bool {
        let mut valid = true;
        for object in self.changes.touched_objects() {
            for validator in validators.validators_for(object.object_type()) {
                if !validator.before_commit(&object, &self.changes, errors) {
                    valid = false;
                }
            }
        }
        valid
    }

    /// Phase 2: drains and runs the registered post-processing
    /// actions in key order.
    pub fn do_post_processing(&mut self, errors: &mut ErrorBuffer) -> bool {
        let actions = std::mem::take(&mut self.post_actions);
        let mut valid = true;
        for action in actions.values() {
            if !action.run(errors) {
                valid = false;
            }
        }
        valid
    }

    /// Phase 3: runs `validate` on every validator of every distinct
    /// touched entity.
    ///
    /// The caller holds the type locks for [`synchronization_keys`]
    /// while this runs. With `do_validation` false the validators are
    /// skipped and the phase trivially passes; the caller still enters
    /// the lock-protected section so work sharing it (such as
    /// indexing post-processes) stays serialized.
    ///
    /// [`synchronization_keys`]: ValidationQueue::synchronization_keys
    pub fn do_validation(
        &self,
        validators: &ValidatorRegistry,
        errors: &mut ErrorBuffer,
        do_validation: bool,
    ) -> bool {
        if !do_validation {
            return true;
        }
        let mut valid = true;
        for object in self.changes.touched_objects() {
            for validator in validators.validators_for(object.object_type()) {
                if !validator.validate(&object, errors) {
                    valid = false;
                }
            }
        }
        valid
    }

    /// Runs `after_commit` on every validator of every distinct
    /// touched entity, on the committed state, outside any lock.
    pub fn do_outer_callbacks(&self, validators: &ValidatorRegistry) {
        for object in self.changes.touched_objects() {
            for validator in validators.validators_for(object.object_type()) {
                validator.after_commit(&object);
            }
        }
    }

    /// The final, order-preserving notification payload.
    #[must_use]
    pub fn modification_events(&self) -> Vec<ModificationEvent> {
        self.changes.modification_events()
    }

    /// Discards all recorded changes and pending actions.
    pub fn clear(&mut self) {
        self.changes.clear();
        self.post_actions.clear();
    }
}

impl fmt::Debug for ValidationQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationQueue")
            .field("changes", &self.changes.len())
            .field("post_actions", &self.post_actions.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::object::{GraphObject, ObjectId};
    use crate::validate::EntityValidator;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Stub {
        id: ObjectId,
        type_name: &'static str,
    }

    impl GraphObject for Stub {
        fn id(&self) -> ObjectId {
            self.id
        }

        fn object_type(&self) -> &str {
            self.type_name
        }

        fn property(&self, _key: &str) -> Option<PropertyValue> {
            None
        }
    }

    fn stub(type_name: &'static str) -> ObjectRef {
        Arc::new(Stub {
            id: ObjectId::new(),
            type_name,
        })
    }

    struct Counting {
        calls: Arc<AtomicUsize>,
    }

    impl EntityValidator for Counting {
        fn before_commit(
            &self,
            _object: &ObjectRef,
            _changes: &ChangeSet,
            _errors: &mut ErrorBuffer,
        ) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    #[test]
    fn inner_callbacks_run_once_per_distinct_entity() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = ValidatorRegistry::new();
        registry.register(
            "User",
            Arc::new(Counting {
                calls: Arc::clone(&calls),
            }),
        );

        let mut queue = ValidationQueue::new();
        let user = stub("User");
        queue.create(ObjectRef::clone(&user));
        queue.modify(user, "name", None, Some("x".into()));

        let mut errors = ErrorBuffer::new();
        assert!(queue.do_inner_callbacks(&registry, &mut errors));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn inner_callbacks_accumulate_all_errors() {
        struct Failing(&'static str);
        impl EntityValidator for Failing {
            fn before_commit(
                &self,
                object: &ObjectRef,
                _changes: &ChangeSet,
                errors: &mut ErrorBuffer,
            ) -> bool {
                errors.add(ValidationError::new(object.object_type(), self.0));
                false
            }
        }

        let registry = ValidatorRegistry::new();
        registry.register("User", Arc::new(Failing("a")));
        registry.register("User", Arc::new(Failing("b")));

        let mut queue = ValidationQueue::new();
        queue.create(stub("User"));

        let mut errors = ErrorBuffer::new();
        assert!(!queue.do_inner_callbacks(&registry, &mut errors));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn post_process_dedupes_by_key() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut queue = ValidationQueue::new();

        for _ in 0..3 {
            let runs = Arc::clone(&runs);
            queue.post_process(
                "reindex:User",
                Box::new(move |_errors: &mut ErrorBuffer| {
                    runs.fetch_add(1, Ordering::SeqCst);
                    true
                }),
            );
        }

        let mut errors = ErrorBuffer::new();
        assert!(queue.do_post_processing(&mut errors));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn post_processes_run_in_key_order() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut queue = ValidationQueue::new();

        for key in ["b", "a", "c"] {
            let order = Arc::clone(&order);
            queue.post_process(
                key,
                Box::new(move |_errors: &mut ErrorBuffer| {
                    order.lock().push(key);
                    true
                }),
            );
        }

        let mut errors = ErrorBuffer::new();
        queue.do_post_processing(&mut errors);
        assert_eq!(*order.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn post_processing_drains_actions() {
        let mut queue = ValidationQueue::new();
        queue.post_process("once", Box::new(|_: &mut ErrorBuffer| true));

        let mut errors = ErrorBuffer::new();
        assert!(queue.do_post_processing(&mut errors));
        // A second run has nothing left to do.
        assert!(queue.do_post_processing(&mut errors));
    }

    #[test]
    fn validation_skipped_when_disabled() {
        struct Failing;
        impl EntityValidator for Failing {
            fn validate(&self, object: &ObjectRef, errors: &mut ErrorBuffer) -> bool {
                errors.add(ValidationError::new(object.object_type(), "bad"));
                false
            }
        }

        let registry = ValidatorRegistry::new();
        registry.register("User", Arc::new(Failing));

        let mut queue = ValidationQueue::new();
        queue.create(stub("User"));

        let mut errors = ErrorBuffer::new();
        assert!(queue.do_validation(&registry, &mut errors, false));
        assert!(!queue.do_validation(&registry, &mut errors, true));
    }

    #[test]
    fn clear_discards_changes_and_actions() {
        let mut queue = ValidationQueue::new();
        queue.create(stub("User"));
        queue.post_process("k", Box::new(|_: &mut ErrorBuffer| true));

        queue.clear();
        assert!(queue.changes().is_empty());
        assert!(queue.synchronization_keys().is_empty());
    }
}
