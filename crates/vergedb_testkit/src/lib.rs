//! # VergeDB Testkit
//!
//! Test utilities for VergeDB.
//!
//! This crate provides:
//! - Test entities implementing [`vergedb_core::GraphObject`]
//! - A collecting listener for asserting on notification payloads
//! - Canned validators (rejecting, unique-name)
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vergedb_testkit::prelude::*;
//!
//! let node = TestNode::new("User").with_property("name", "alice").into_ref();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
