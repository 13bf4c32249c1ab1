//! # VergeDB Core
//!
//! Transactional change-tracking and validation-commit pipeline for
//! graph-style stores.
//!
//! This crate provides:
//! - [`TransactionManager`] / [`TransactionContext`] - nested logical
//!   transactions sharing one physical engine transaction
//! - [`ChangeSet`] - an ordered record of entity creations,
//!   modifications and deletions gathered during one transaction
//! - [`ValidationQueue`] - the three-phase commit protocol (inner
//!   callbacks, post-processing, validation under type locks)
//! - [`TypeLockRegistry`] - per-entity-type validation locks acquired
//!   as a set in a deterministic order
//! - [`ListenerRegistry`] - observers notified with the finalized
//!   [`ModificationEvent`] list after a successful commit
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vergedb_core::TransactionManager;
//! use vergedb_engine::InMemoryEngine;
//!
//! let manager = TransactionManager::new(Arc::new(InMemoryEngine::new()));
//!
//! let mut tx = manager.begin()?;
//! tx.node_created(node)?;
//! tx.commit()?;
//! tx.finish()?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change_set;
mod config;
mod error;
mod listener;
mod locks;
mod object;
mod queue;
mod transaction;
mod types;
mod validate;

pub use change_set::{ChangeEntry, ChangeKind, ChangeSet, ModificationEvent};
pub use config::Config;
pub use error::{ErrorBuffer, TxError, TxResult, ValidationError};
pub use listener::{ListenerRegistry, TransactionListener};
pub use locks::TypeLockRegistry;
pub use object::{GraphObject, ObjectId, ObjectRef, PropertyValue};
pub use queue::ValidationQueue;
pub use transaction::{TransactionContext, TransactionManager};
pub use types::TransactionId;
pub use validate::{EntityValidator, PostProcess, ValidatorRegistry};

pub use vergedb_engine::TxOutcome;
