//! Ordered record of entity changes within one transaction.

use crate::object::{ObjectId, ObjectRef, PropertyValue};
use std::collections::{BTreeSet, HashSet};

/// Kind of change recorded for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Entity was created.
    Created,
    /// A property of the entity was modified.
    Modified,
    /// Entity was deleted.
    Deleted,
}

/// A single recorded change.
///
/// Entries hold a reference to the live entity; modification entries
/// additionally carry immutable snapshots of the old and new value.
#[derive(Debug, Clone)]
pub enum ChangeEntry {
    /// Entity creation.
    Created {
        /// The created entity.
        object: ObjectRef,
    },
    /// Property modification.
    Modified {
        /// The modified entity.
        object: ObjectRef,
        /// Property key that changed.
        key: String,
        /// Value before the change.
        old: Option<PropertyValue>,
        /// Value after the change.
        new: Option<PropertyValue>,
    },
    /// Entity deletion.
    Deleted {
        /// The deleted entity.
        object: ObjectRef,
        /// Whether the deletion was a passive side effect of another
        /// deletion (cascade), as opposed to a direct request.
        passive: bool,
    },
}

impl ChangeEntry {
    /// The entity this entry refers to.
    #[must_use]
    pub fn object(&self) -> &ObjectRef {
        match self {
            Self::Created { object }
            | Self::Modified { object, .. }
            | Self::Deleted { object, .. } => object,
        }
    }

    /// The kind of change.
    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Created { .. } => ChangeKind::Created,
            Self::Modified { .. } => ChangeKind::Modified,
            Self::Deleted { .. } => ChangeKind::Deleted,
        }
    }
}

/// Append-only record of all changes in one physical transaction.
///
/// Insertion order is preserved end-to-end: the final notification
/// payload delivers events in exactly the order the changes were
/// recorded.
#[derive(Debug, Default)]
pub struct ChangeSet {
    entries: Vec<ChangeEntry>,
}

impl ChangeSet {
    /// Creates an empty change set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an entity creation.
    pub fn create(&mut self, object: ObjectRef) {
        self.entries.push(ChangeEntry::Created { object });
    }

    /// Records a property modification with old/new snapshots.
    pub fn modify(
        &mut self,
        object: ObjectRef,
        key: impl Into<String>,
        old: Option<PropertyValue>,
        new: Option<PropertyValue>,
    ) {
        self.entries.push(ChangeEntry::Modified {
            object,
            key: key.into(),
            old,
            new,
        });
    }

    /// Records an entity deletion.
    pub fn delete(&mut self, object: ObjectRef, passive: bool) {
        self.entries.push(ChangeEntry::Deleted { object, passive });
    }

    /// The recorded entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[ChangeEntry] {
        &self.entries
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no changes have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The set of distinct entity-type names touched by this change
    /// set.
    ///
    /// Recomputed on each call, never stored; the `BTreeSet` gives the
    /// lexicographic order the type-lock registry relies on.
    #[must_use]
    pub fn synchronization_keys(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .map(|entry| entry.object().object_type().to_owned())
            .collect()
    }

    /// Distinct entities touched by this change set, in first-touch
    /// order.
    #[must_use]
    pub fn touched_objects(&self) -> Vec<ObjectRef> {
        let mut seen: HashSet<(String, ObjectId)> = HashSet::new();
        let mut objects = Vec::new();
        for entry in &self.entries {
            let object = entry.object();
            let key = (object.object_type().to_owned(), object.id());
            if seen.insert(key) {
                objects.push(ObjectRef::clone(object));
            }
        }
        objects
    }

    /// Projects the entries into the final notification payload.
    #[must_use]
    pub fn modification_events(&self) -> Vec<ModificationEvent> {
        self.entries.iter().map(ModificationEvent::from_entry).collect()
    }

    /// Discards all recorded entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Immutable post-commit projection of a change entry.
///
/// This is the unit delivered to transaction listeners after a
/// successful commit.
#[derive(Debug, Clone)]
pub struct ModificationEvent {
    /// The entity the change applies to.
    pub object: ObjectRef,
    /// The kind of change.
    pub kind: ChangeKind,
    /// Property key, for modifications.
    pub key: Option<String>,
    /// Old value snapshot, for modifications.
    pub old: Option<PropertyValue>,
    /// New value snapshot, for modifications.
    pub new: Option<PropertyValue>,
    /// Passive-deletion flag, for deletions.
    pub passive: bool,
}

impl ModificationEvent {
    fn from_entry(entry: &ChangeEntry) -> Self {
        match entry {
            ChangeEntry::Created { object } => Self {
                object: ObjectRef::clone(object),
                kind: ChangeKind::Created,
                key: None,
                old: None,
                new: None,
                passive: false,
            },
            ChangeEntry::Modified {
                object,
                key,
                old,
                new,
            } => Self {
                object: ObjectRef::clone(object),
                kind: ChangeKind::Modified,
                key: Some(key.clone()),
                old: old.clone(),
                new: new.clone(),
                passive: false,
            },
            ChangeEntry::Deleted { object, passive } => Self {
                object: ObjectRef::clone(object),
                kind: ChangeKind::Deleted,
                key: None,
                old: None,
                new: None,
                passive: *passive,
            },
        }
    }
}
