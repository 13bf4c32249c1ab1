//! Transaction manager and per-transaction context.

mod context;
mod manager;

pub use context::TransactionContext;
pub use manager::TransactionManager;
