use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A persisted type that repositories can read and write.
///
/// Entities are stored as JSON documents keyed by [`Entity::key`] in the
/// table named by [`Entity::TABLE`]. Navigation properties declared by
/// [`Entity::relations`] are populated on reads that include them and are
/// never written back.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const TABLE: &'static str;

    fn key(&self) -> String;

    fn relations() -> &'static [Relation] {
        &[]
    }
}

/// Whether a navigation resolves to a single row or a list of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// A navigation property of an entity.
///
/// Rows of `table` whose `foreign_field` equals the owner's `local_field`
/// are attached under `name`. `relations` lists the navigations of the
/// related table so dotted include paths can continue through it.
#[derive(Debug, Clone, Copy)]
pub struct Relation {
    pub name: &'static str,
    pub table: &'static str,
    pub local_field: &'static str,
    pub foreign_field: &'static str,
    pub cardinality: Cardinality,
    pub relations: fn() -> &'static [Relation],
}

/// Tracking state of an entity inside a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityState {
    Detached,
    Unchanged,
    Added,
    Modified,
    Deleted,
}

/// A tracked entity's identity and state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityEntry {
    pub table: String,
    pub key: String,
    pub state: EntityState,
}

/// One staged write handed to a store for commit.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub table: String,
    pub key: String,
    pub kind: ChangeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChangeKind {
    Insert(Value),
    Update(Value),
    Delete,
}

/// Result of a raw SQL query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl DataTable {
    /// Looks up a cell by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(index)
    }
}

/// A named parameter of a raw SQL query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlParameter {
    pub name: String,
    pub value: Value,
}

impl SqlParameter {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}
