//! Specification-driven repositories.
//!
//! Implementations behind the types and traits of `repokit_core`: storage
//! backends, the in-memory cache, the `DbContext` unit of work and the query,
//! command and cached repositories built on it.

pub mod cache;
pub mod config;
pub mod context;
pub mod repository;
pub mod storage;
