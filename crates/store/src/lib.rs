//! Account storage boundary.
//!
//! This crate defines an infrastructure-facing abstraction for reading and
//! committing account snapshots without making any storage assumptions, plus
//! the in-memory reference implementation used by tests and development.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryAccountStore;
pub use r#trait::{AccountStore, StoreError};
