//! Storage backend implementations.
//!
//! This module provides concrete implementations of the `Store` trait
//! defined in `repokit_core::storage`. Backends are selected at compile time
//! via feature flags.
//!
//! # Feature Flags
//!
//! - `inmemory` (default): In-memory store, insertion ordered, no persistence
//! - `sqlite` (default): SQLite store using `rusqlite` and `tokio-rusqlite`
//!
//! Both backends can be enabled at the same time.

#[cfg(feature = "inmemory")]
pub mod inmemory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "inmemory")]
pub use inmemory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
