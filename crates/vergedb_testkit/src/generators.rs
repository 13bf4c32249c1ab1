//! Proptest strategies for transaction test inputs.

use proptest::prelude::*;
use vergedb_core::PropertyValue;

/// One scripted change applied to a transaction context in a
/// property-based test.
#[derive(Debug, Clone)]
pub enum ScriptedChange {
    /// Create an entity of the given type.
    Create {
        /// Entity type name.
        type_name: String,
    },
    /// Modify a property of an entity of the given type.
    Modify {
        /// Entity type name.
        type_name: String,
        /// Property key.
        key: String,
        /// Value before the change.
        old: Option<PropertyValue>,
        /// Value after the change.
        new: Option<PropertyValue>,
    },
    /// Delete an entity of the given type.
    Delete {
        /// Entity type name.
        type_name: String,
        /// Whether the deletion is a side effect of another deletion.
        passive: bool,
    },
}

impl ScriptedChange {
    /// The entity type the change touches.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Create { type_name }
            | Self::Modify { type_name, .. }
            | Self::Delete { type_name, .. } => type_name,
        }
    }
}

/// Strategy for entity type names.
pub fn type_name() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{0,8}"
}

/// Strategy for property keys.
pub fn property_key() -> impl Strategy<Value = String> {
    "[a-z]{1,12}"
}

/// Strategy for property values. Floats are kept finite so equality
/// assertions in tests stay meaningful.
pub fn property_value() -> impl Strategy<Value = PropertyValue> {
    prop_oneof![
        Just(PropertyValue::Null),
        any::<bool>().prop_map(PropertyValue::Bool),
        (-1_000_000_i64..1_000_000).prop_map(PropertyValue::Int),
        (-1.0e6_f64..1.0e6).prop_map(PropertyValue::Float),
        "[a-zA-Z0-9 ]{0,24}".prop_map(PropertyValue::Text),
    ]
}

/// Strategy for a single scripted change.
pub fn scripted_change() -> impl Strategy<Value = ScriptedChange> {
    prop_oneof![
        type_name().prop_map(|type_name| ScriptedChange::Create { type_name }),
        (
            type_name(),
            property_key(),
            proptest::option::of(property_value()),
            proptest::option::of(property_value()),
        )
            .prop_map(|(type_name, key, old, new)| ScriptedChange::Modify {
                type_name,
                key,
                old,
                new,
            }),
        (type_name(), any::<bool>()).prop_map(|(type_name, passive)| ScriptedChange::Delete {
            type_name,
            passive,
        }),
    ]
}

/// Strategy for a sequence of scripted changes of length 1 to `max`.
pub fn change_script(max: usize) -> impl Strategy<Value = Vec<ScriptedChange>> {
    proptest::collection::vec(scripted_change(), 1..=max)
}
