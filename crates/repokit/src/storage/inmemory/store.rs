//! In-memory store implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;
use tokio::sync::RwLock;

use repokit_core::query::{apply_plan, count_plan, validate_identifier, QueryPlan};
use repokit_core::storage::{
    Change, ChangeKind, DataTable, RepositoryError, Result, SqlParameter, Store,
};

type Table = IndexMap<String, Value>;

/// In-memory storage backend for testing.
///
/// Rows keep insertion order, so unordered reads return rows in the order
/// they were first written.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<HashMap<String, Table>>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of rows stored in `table`.
    pub async fn len(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map_or(0, IndexMap::len)
    }
}

fn apply_change(tables: &mut HashMap<String, Table>, change: &Change) -> Result<()> {
    let table = tables.entry(change.table.clone()).or_default();
    match &change.kind {
        ChangeKind::Insert(body) => {
            if table.contains_key(&change.key) {
                return Err(RepositoryError::AlreadyExists {
                    table: change.table.clone(),
                    key: change.key.clone(),
                });
            }
            table.insert(change.key.clone(), body.clone());
        }
        ChangeKind::Update(body) => match table.get_mut(&change.key) {
            Some(row) => *row = body.clone(),
            None => return Err(concurrency(change)),
        },
        ChangeKind::Delete => {
            if table.shift_remove(&change.key).is_none() {
                return Err(concurrency(change));
            }
        }
    }
    Ok(())
}

fn concurrency(change: &Change) -> RepositoryError {
    RepositoryError::Concurrency {
        table: change.table.clone(),
        key: change.key.clone(),
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn ensure_table(&self, table: &str) -> Result<()> {
        validate_identifier(table)?;
        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default();
        Ok(())
    }

    async fn fetch(&self, plan: &QueryPlan) -> Result<Vec<Value>> {
        plan.validate()?;
        let tables = self.tables.read().await;
        let Some(table) = tables.get(&plan.table) else {
            return Ok(Vec::new());
        };
        Ok(apply_plan(table.values().cloned(), plan))
    }

    async fn count(&self, plan: &QueryPlan) -> Result<usize> {
        plan.validate()?;
        let tables = self.tables.read().await;
        Ok(tables
            .get(&plan.table)
            .map_or(0, |table| count_plan(table.values(), plan)))
    }

    async fn commit(&self, changes: &[Change]) -> Result<usize> {
        let mut tables = self.tables.write().await;

        // Stage on a copy so a failing change leaves the store untouched
        let mut staged = tables.clone();
        for change in changes {
            apply_change(&mut staged, change)?;
        }
        *tables = staged;

        Ok(changes.len())
    }

    async fn execute_raw(&self, _sql: &str, _parameters: &[SqlParameter]) -> Result<DataTable> {
        Err(RepositoryError::QueryFailed(
            "raw SQL is not supported by the in-memory store".to_string(),
        ))
    }
}
