//! In-memory storage backend for testing.
//!
//! Stores every table as an insertion-ordered map of JSON rows wrapped in
//! `Arc<RwLock<_>>`. Data is not persisted.
//!
//! # Example
//!
//! ```rust,ignore
//! use repokit::storage::inmemory::InMemoryStore;
//!
//! let store = Arc::new(InMemoryStore::new());
//! let context = DbContext::new(store);
//! ```

mod store;

pub use store::InMemoryStore;
