//! Unit of work shared by query and command repositories.

mod db_context;
mod tracker;

pub use db_context::DbContext;
pub use tracker::ChangeTracker;
