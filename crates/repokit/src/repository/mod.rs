//! Repository implementations.
//!
//! - `DbQueryRepository` / `DbCommandRepository`: read and write paths over a
//!   shared `DbContext`
//! - `CachedQueryRepository`: read-through cache decorator for any
//!   `QueryRepository`
//! - `Repositories`: hands out repositories sharing one context and cache

mod cached;
mod cancellation;
mod command;
mod query;
mod registry;

pub use cached::{CachedQueryRepository, DEFAULT_CACHE_EXPIRY_SECS};
pub use cancellation::{cancellable, Cancellable};
pub use command::DbCommandRepository;
pub use query::DbQueryRepository;
pub use registry::Repositories;
