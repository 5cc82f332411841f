use crate::specification::Condition;
use crate::storage::{RepositoryError, Result};

/// One ordering key of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

/// Untyped, store-facing form of a [`Query`](super::Query).
///
/// Conditions are ANDed. Ordering applies to the full filtered set before the
/// `skip`/`take` window.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub table: String,
    pub tracking: bool,
    pub conditions: Vec<Condition>,
    pub includes: Vec<String>,
    pub ordering: Vec<SortKey>,
    pub skip: usize,
    pub take: Option<usize>,
}

impl QueryPlan {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            tracking: true,
            conditions: Vec::new(),
            includes: Vec::new(),
            ordering: Vec::new(),
            skip: 0,
            take: None,
        }
    }

    /// Checks the table name and every field path the plan references.
    pub fn validate(&self) -> Result<()> {
        validate_identifier(&self.table)?;
        for condition in &self.conditions {
            for field in condition.fields() {
                validate_field_path(field)?;
            }
        }
        for key in &self.ordering {
            validate_field_path(&key.field)?;
        }
        for include in &self.includes {
            validate_field_path(include)?;
        }
        Ok(())
    }
}

fn is_identifier(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Accepts `[A-Za-z0-9_]+`.
pub fn validate_identifier(name: &str) -> Result<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(RepositoryError::InvalidArgument(format!(
            "invalid identifier: {name:?}"
        )))
    }
}

/// Accepts dotted paths of identifiers such as `category.name`.
pub fn validate_field_path(path: &str) -> Result<()> {
    if path.split('.').all(is_identifier) {
        Ok(())
    } else {
        Err(RepositoryError::InvalidArgument(format!(
            "invalid field path: {path:?}"
        )))
    }
}
