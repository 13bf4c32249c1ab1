//! Error types for engine operations.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur in the physical graph engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The transaction has already been finished.
    #[error("transaction is closed")]
    TransactionClosed,

    /// Operation not permitted in the current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },

    /// An engine-specific backend failure.
    ///
    /// The core surfaces these opaquely; the message is all a caller
    /// gets to see.
    #[error("engine backend failure: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },
}

impl EngineError {
    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates a backend failure error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}
