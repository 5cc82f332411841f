//! SQLite storage backend implementation.
//!
//! This module provides a SQLite-based implementation of the `Store` trait
//! using `rusqlite` for synchronous operations and `tokio-rusqlite` for async
//! wrapping. Entities are stored as JSON documents, one table per entity type.

mod conversions;
mod error;
mod schema;
mod store;

pub use store::SqliteStore;
