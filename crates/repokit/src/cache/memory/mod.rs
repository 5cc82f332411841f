//! In-memory cache backend implementation.
//!
//! Provides a thread-safe in-memory cache with TTL support and LRU eviction
//! for single-process deployments.

mod cache;

pub use cache::MemoryCache;
