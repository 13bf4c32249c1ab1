//! # VergeDB Engine
//!
//! Physical graph-engine abstraction for VergeDB.
//!
//! This crate defines the narrow transaction-control surface the
//! VergeDB core needs from an underlying graph store:
//!
//! - [`GraphEngine`] - opens physical transactions
//! - [`PhysicalTransaction`] - depth-aware nesting, success/failure
//!   flags, and a finish step that commits or rolls back
//!
//! The engine is assumed to provide ACID single-writer transactions on
//! its own; VergeDB layers change tracking and validation on top and
//! never reaches around this interface.
//!
//! ## Available Engines
//!
//! - [`InMemoryEngine`] - for testing and ephemeral databases
//!
//! ## Example
//!
//! ```rust
//! use vergedb_engine::{GraphEngine, InMemoryEngine, PhysicalTransaction, TxOutcome};
//! use uuid::Uuid;
//!
//! let engine = InMemoryEngine::new();
//! let id = Uuid::new_v4();
//!
//! let mut tx = engine.begin_memory();
//! tx.put(id, b"payload".to_vec()).unwrap();
//! tx.mark_success().unwrap();
//! assert_eq!(tx.finish().unwrap(), TxOutcome::Committed);
//!
//! assert_eq!(engine.get(&id), Some(b"payload".to_vec()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod traits;

pub use error::{EngineError, EngineResult};
pub use memory::{InMemoryEngine, MemoryTransaction};
pub use traits::{GraphEngine, PhysicalTransaction, TxOutcome};
