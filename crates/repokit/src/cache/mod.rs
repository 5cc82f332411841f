//! Cache backend implementations.
//!
//! Concrete implementations of the `repokit_core::cache::Cache` trait.

pub mod memory;

pub use memory::MemoryCache;
