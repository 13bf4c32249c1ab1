//! Error types and the validation error buffer.

use crate::object::ObjectId;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use vergedb_engine::EngineError;

/// Result type for transaction operations.
pub type TxResult<T> = Result<T, TxError>;

/// A single structured validation error.
///
/// Serializable so a resource layer above can render the accumulated
/// buffer as a response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Entity type the error applies to.
    pub object_type: String,
    /// Entity the error applies to, when known.
    pub object_id: Option<ObjectId>,
    /// Property the error applies to, when property-scoped.
    pub property: Option<String>,
    /// Machine-readable error token, e.g. `"already_taken"`.
    pub token: String,
}

impl ValidationError {
    /// Creates a type-scoped validation error.
    pub fn new(object_type: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            object_id: None,
            property: None,
            token: token.into(),
        }
    }

    /// Creates an entity-scoped validation error.
    pub fn for_object(
        object_type: impl Into<String>,
        object_id: ObjectId,
        token: impl Into<String>,
    ) -> Self {
        Self {
            object_type: object_type.into(),
            object_id: Some(object_id),
            property: None,
            token: token.into(),
        }
    }

    /// Creates a property-scoped validation error.
    pub fn for_property(
        object_type: impl Into<String>,
        object_id: ObjectId,
        property: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            object_type: object_type.into(),
            object_id: Some(object_id),
            property: Some(property.into()),
            token: token.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.object_type)?;
        if let Some(property) = &self.property {
            write!(f, ".{property}")?;
        }
        write!(f, ": {}", self.token)
    }
}

/// Accumulates structured validation errors across the commit phases.
///
/// All validators of a phase run to completion and append here, so a
/// caller sees every violation at once rather than only the first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorBuffer {
    errors: Vec<ValidationError>,
}

impl ErrorBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an error.
    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Whether the buffer holds no errors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of accumulated errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// The accumulated errors in append order.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }
}

impl fmt::Display for ErrorBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.errors {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{error}")?;
            first = false;
        }
        Ok(())
    }
}

/// Errors that can occur in the transaction pipeline.
#[derive(Debug, Error)]
pub enum TxError {
    /// A physical engine error, surfaced opaquely.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Phase 1 or phase 3 rejected the change set.
    ///
    /// The physical transaction is flagged failed but not yet rolled
    /// back; the caller's subsequent `finish` performs the rollback.
    #[error("validation failed: {errors}")]
    ValidationFailed {
        /// The accumulated structured errors.
        errors: ErrorBuffer,
    },

    /// Type-lock acquisition timed out or was cancelled.
    ///
    /// The transaction is abandoned: neither validated nor failed with
    /// a validation error. Success is never flagged, so `finish` rolls
    /// back.
    #[error("type lock acquisition cancelled")]
    LockCancelled,

    /// A change-recording call on a context whose top-level
    /// transaction has already finished.
    #[error("no active transaction")]
    NotInTransaction,
}

impl TxError {
    /// Creates a validation failure carrying the accumulated buffer.
    #[must_use]
    pub fn validation_failed(errors: ErrorBuffer) -> Self {
        Self::ValidationFailed { errors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_accumulates_in_order() {
        let mut buffer = ErrorBuffer::new();
        assert!(buffer.is_empty());

        buffer.add(ValidationError::new("User", "missing_name"));
        buffer.add(ValidationError::new("User", "missing_email"));

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.errors()[0].token, "missing_name");
        assert_eq!(buffer.errors()[1].token, "missing_email");
    }

    #[test]
    fn buffer_display_joins_errors() {
        let mut buffer = ErrorBuffer::new();
        buffer.add(ValidationError::new("User", "a"));
        buffer.add(ValidationError::new("Group", "b"));
        assert_eq!(format!("{buffer}"), "User: a; Group: b");
    }

    #[test]
    fn property_scoped_error_display() {
        let error =
            ValidationError::for_property("User", ObjectId::new(), "name", "already_taken");
        assert_eq!(format!("{error}"), "User.name: already_taken");
    }

    #[test]
    fn validation_error_serializes() {
        let error = ValidationError::new("User", "missing_name");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["object_type"], "User");
        assert_eq!(json["token"], "missing_name");
    }

    #[test]
    fn engine_error_converts() {
        let err: TxError = EngineError::TransactionClosed.into();
        assert!(matches!(err, TxError::Engine(_)));
    }
}
