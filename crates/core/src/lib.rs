//! Functional core of repokit.
//!
//! Specifications, query plans, pure row evaluation, repository contracts and
//! cache keys. Nothing in this crate performs I/O; stores, caches and the
//! change-tracking context live in the `repokit` crate.

pub mod cache;
pub mod query;
pub mod specification;
pub mod storage;
