//! Test entities, listeners and validators.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use vergedb_core::{
    ChangeSet, Config, EntityValidator, ErrorBuffer, GraphObject, ModificationEvent, ObjectId,
    ObjectRef, PropertyValue, TransactionListener, TransactionManager, ValidationError,
};
use vergedb_engine::InMemoryEngine;

/// Initializes a tracing subscriber for test debugging.
///
/// Honors `RUST_LOG`; repeated calls are harmless.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Creates a transaction manager backed by a fresh in-memory engine.
#[must_use]
pub fn memory_manager() -> TransactionManager {
    TransactionManager::new(Arc::new(InMemoryEngine::new()))
}

/// Like [`memory_manager`], with explicit configuration.
#[must_use]
pub fn memory_manager_with(config: Config) -> TransactionManager {
    TransactionManager::with_config(Arc::new(InMemoryEngine::new()), config)
}

/// A graph entity for tests, built with fixed properties.
#[derive(Debug, Clone)]
pub struct TestNode {
    id: ObjectId,
    type_name: String,
    properties: HashMap<String, PropertyValue>,
    node: bool,
}

impl TestNode {
    /// Creates a node of the given entity type.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            id: ObjectId::new(),
            type_name: type_name.into(),
            properties: HashMap::new(),
            node: true,
        }
    }

    /// Creates a relationship of the given entity type.
    #[must_use]
    pub fn relationship(type_name: impl Into<String>) -> Self {
        Self {
            node: false,
            ..Self::new(type_name)
        }
    }

    /// Sets a property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// The entity's object ID.
    #[must_use]
    pub fn object_id(&self) -> ObjectId {
        self.id
    }

    /// Wraps the entity in a shared reference.
    #[must_use]
    pub fn into_ref(self) -> ObjectRef {
        Arc::new(self)
    }
}

impl GraphObject for TestNode {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn object_type(&self) -> &str {
        &self.type_name
    }

    fn property(&self, key: &str) -> Option<PropertyValue> {
        self.properties.get(key).cloned()
    }

    fn is_node(&self) -> bool {
        self.node
    }
}

/// Listener that collects every notification payload it receives.
#[derive(Debug, Default)]
pub struct CollectingListener {
    batches: Mutex<Vec<Vec<ModificationEvent>>>,
}

impl CollectingListener {
    /// Creates an empty listener.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of notifications received (one per committed
    /// transaction).
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.batches.lock().len()
    }

    /// All received notification payloads, in arrival order.
    #[must_use]
    pub fn batches(&self) -> Vec<Vec<ModificationEvent>> {
        self.batches.lock().clone()
    }

    /// All received events, flattened across notifications.
    #[must_use]
    pub fn events(&self) -> Vec<ModificationEvent> {
        self.batches.lock().iter().flatten().cloned().collect()
    }
}

impl TransactionListener for CollectingListener {
    fn transaction_committed(&self, events: &[ModificationEvent]) {
        self.batches.lock().push(events.to_vec());
    }
}

/// Which commit phase a [`RejectingValidator`] fails in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectPhase {
    /// Fail in phase 1 (inner callbacks).
    BeforeCommit,
    /// Fail in phase 3 (validation under type locks).
    Validation,
}

/// Validator that rejects every touched entity in one phase.
#[derive(Debug)]
pub struct RejectingValidator {
    phase: RejectPhase,
    token: String,
}

impl RejectingValidator {
    /// Creates a validator failing in the given phase with `token`.
    #[must_use]
    pub fn new(phase: RejectPhase, token: impl Into<String>) -> Self {
        Self {
            phase,
            token: token.into(),
        }
    }
}

impl EntityValidator for RejectingValidator {
    fn before_commit(
        &self,
        object: &ObjectRef,
        _changes: &ChangeSet,
        errors: &mut ErrorBuffer,
    ) -> bool {
        if self.phase != RejectPhase::BeforeCommit {
            return true;
        }
        errors.add(ValidationError::for_object(
            object.object_type(),
            object.id(),
            self.token.clone(),
        ));
        false
    }

    fn validate(&self, object: &ObjectRef, errors: &mut ErrorBuffer) -> bool {
        if self.phase != RejectPhase::Validation {
            return true;
        }
        errors.add(ValidationError::for_object(
            object.object_type(),
            object.id(),
            self.token.clone(),
        ));
        false
    }
}

/// Uniqueness validator over the `name` property.
///
/// Keeps its own registry of claimed names; the first transaction to
/// validate an entity with a given name claims it, later ones fail.
/// Runs in phase 3, so concurrent claims for the same entity type are
/// serialized by the type lock.
#[derive(Debug, Default)]
pub struct UniqueNameValidator {
    claimed: Mutex<HashSet<String>>,
}

impl UniqueNameValidator {
    /// Creates a validator with no claimed names.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Names claimed so far.
    #[must_use]
    pub fn claimed(&self) -> Vec<String> {
        self.claimed.lock().iter().cloned().collect()
    }
}

impl EntityValidator for UniqueNameValidator {
    fn validate(&self, object: &ObjectRef, errors: &mut ErrorBuffer) -> bool {
        let Some(PropertyValue::Text(name)) = object.property("name") else {
            return true;
        };
        if self.claimed.lock().insert(name) {
            true
        } else {
            errors.add(ValidationError::for_property(
                object.object_type(),
                object.id(),
                "name",
                "already_taken",
            ));
            false
        }
    }
}
