//! Unit of work over a [`Store`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;
use tokio::sync::Mutex;

use repokit_core::query::{field_value, PagedQuery, PagedResponse, Query, QueryPlan};
use repokit_core::specification::{Condition, PagingOptions};
use repokit_core::storage::{
    Cardinality, DataTable, Entity, EntityEntry, EntityState, Relation, RepositoryError, Result,
    SqlParameter, Store,
};

use super::ChangeTracker;

/// Serializes an entity for storage, leaving out its navigation properties.
fn to_body<T: Entity>(entity: &T) -> Result<Value> {
    let mut body = serde_json::to_value(entity)?;
    if let Some(object) = body.as_object_mut() {
        for relation in T::relations() {
            object.remove(relation.name);
        }
    }
    Ok(body)
}

/// Shared unit of work: executes queries against a store, resolves
/// includes, and stages writes until [`save_changes`](Self::save_changes).
///
/// Repositories hold it through an `Arc`; every repository sharing a context
/// shares its staged changes.
pub struct DbContext<S> {
    store: Arc<S>,
    tracker: Mutex<ChangeTracker>,
    tables: Mutex<HashSet<String>>,
}

impl<S: Store> DbContext<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            tracker: Mutex::new(ChangeTracker::new()),
            tables: Mutex::new(HashSet::new()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Starts a tracking query over every entity of type `T`.
    pub fn set<T: Entity>(&self) -> Query<T> {
        Query::new()
    }

    async fn ensure_table(&self, table: &str) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if tables.contains(table) {
            return Ok(());
        }
        self.store.ensure_table(table).await?;
        tables.insert(table.to_string());
        Ok(())
    }

    async fn fetch_rows(&self, plan: &QueryPlan) -> Result<Vec<Value>> {
        self.ensure_table(&plan.table).await?;
        self.store.fetch(plan).await
    }

    /// Executes a query. Tracking queries register every returned entity
    /// as `Unchanged`.
    pub async fn to_list<T: Entity>(&self, query: &Query<T>) -> Result<Vec<T>> {
        let plan = query.plan();
        let mut rows = self.fetch_rows(plan).await?;

        for include in &plan.includes {
            let path: Vec<&str> = include.split('.').collect();
            self.load_include(&mut rows, T::TABLE, T::relations(), &path)
                .await?;
        }

        let entities = rows
            .into_iter()
            .map(serde_json::from_value::<T>)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if plan.tracking {
            let mut tracker = self.tracker.lock().await;
            for entity in &entities {
                tracker.attach(T::TABLE, &entity.key(), to_body(entity)?);
            }
        }

        tracing::debug!(
            table = T::TABLE,
            rows = entities.len(),
            tracking = plan.tracking,
            "Query executed"
        );
        Ok(entities)
    }

    /// Executes a query and returns its first entity.
    pub async fn first<T: Entity>(&self, query: &Query<T>) -> Result<Option<T>> {
        let entities = self.to_list(&query.clone().take(1)).await?;
        Ok(entities.into_iter().next())
    }

    /// Counts the entities a query matches, ignoring its window.
    pub async fn count<T: Entity>(&self, query: &Query<T>) -> Result<usize> {
        let plan = query.plan();
        self.ensure_table(&plan.table).await?;
        self.store.count(plan).await
    }

    /// Counts `query`, then restricts it to one page.
    ///
    /// The count and the later fetch are separate statements.
    pub async fn to_paged_response<T: Entity>(
        &self,
        query: Query<T>,
        paging: Option<&PagingOptions>,
    ) -> Result<PagedResponse<T>> {
        let paged = PagedQuery::new(query, paging);
        let total_count = self.count(&paged.count_query).await?;
        Ok(PagedResponse {
            query: paged.query,
            total_count,
        })
    }

    /// Loads one dotted include path into `rows`.
    ///
    /// Related rows are fetched with a single `IN` query per level, nested
    /// levels are loaded into them first, then they are attached to their
    /// owners under the navigation name.
    fn load_include<'a>(
        &'a self,
        rows: &'a mut [Value],
        table: &'a str,
        relations: &'static [Relation],
        path: &'a [&'a str],
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let Some((name, rest)) = path.split_first() else {
                return Ok(());
            };
            let relation = relations
                .iter()
                .find(|r| r.name == *name)
                .ok_or_else(|| {
                    RepositoryError::InvalidArgument(format!(
                        "{table} has no navigation named {name:?}"
                    ))
                })?;

            let mut seen = HashSet::new();
            let keys: Vec<Value> = rows
                .iter()
                .filter_map(|row| field_value(row, relation.local_field))
                .filter(|value| !value.is_null() && seen.insert(value.to_string()))
                .cloned()
                .collect();

            let mut related = if keys.is_empty() {
                Vec::new()
            } else {
                let mut plan = QueryPlan::new(relation.table);
                plan.conditions.push(Condition::In {
                    field: relation.foreign_field.to_string(),
                    values: keys,
                });
                self.fetch_rows(&plan).await?
            };
            self.load_include(&mut related, relation.table, (relation.relations)(), rest)
                .await?;

            let mut grouped: HashMap<String, Vec<Value>> = HashMap::new();
            for row in related {
                if let Some(key) = field_value(&row, relation.foreign_field).map(Value::to_string) {
                    grouped.entry(key).or_default().push(row);
                }
            }

            for row in rows.iter_mut() {
                let matches = field_value(row, relation.local_field)
                    .filter(|value| !value.is_null())
                    .and_then(|value| grouped.get(&value.to_string()))
                    .cloned()
                    .unwrap_or_default();
                let value = match relation.cardinality {
                    Cardinality::One => matches.into_iter().next().unwrap_or(Value::Null),
                    Cardinality::Many => Value::Array(matches),
                };
                if let Some(object) = row.as_object_mut() {
                    object.insert(relation.name.to_string(), value);
                }
            }
            Ok(())
        })
    }

    /// Stages an insert.
    pub async fn add<T: Entity>(&self, entity: &T) -> Result<EntityEntry> {
        let body = to_body(entity)?;
        let key = entity.key();
        let state = self.tracker.lock().await.add(T::TABLE, &key, body);
        Ok(EntityEntry {
            table: T::TABLE.to_string(),
            key,
            state,
        })
    }

    /// Stages an update.
    pub async fn update<T: Entity>(&self, entity: &T) -> Result<EntityState> {
        let body = to_body(entity)?;
        Ok(self
            .tracker
            .lock()
            .await
            .update(T::TABLE, &entity.key(), body))
    }

    /// Stages a delete.
    pub async fn remove<T: Entity>(&self, entity: &T) -> EntityState {
        self.tracker.lock().await.remove(T::TABLE, &entity.key())
    }

    /// Tracking entry for an entity; `Detached` when it is not tracked.
    pub async fn entry<T: Entity>(&self, entity: &T) -> EntityEntry {
        let key = entity.key();
        let state = self.tracker.lock().await.state(T::TABLE, &key);
        EntityEntry {
            table: T::TABLE.to_string(),
            key,
            state,
        }
    }

    pub async fn tracked_entries(&self) -> Vec<EntityEntry> {
        self.tracker.lock().await.entries()
    }

    /// Drops every staged change and tracked entity.
    pub async fn clear_tracker(&self) {
        self.tracker.lock().await.clear();
    }

    /// Commits every staged change atomically and returns the number of
    /// rows written. On failure nothing is written and the staged changes
    /// stay as they were.
    pub async fn save_changes(&self) -> Result<usize> {
        let mut tracker = self.tracker.lock().await;
        if !tracker.has_changes() {
            return Ok(0);
        }
        let changes = tracker.pending_changes();

        let tables: HashSet<&str> = changes.iter().map(|c| c.table.as_str()).collect();
        for table in tables {
            self.ensure_table(table).await?;
        }

        let affected = self.store.commit(&changes).await?;
        tracker.accept_changes();

        tracing::debug!(changes = changes.len(), affected, "Changes saved");
        Ok(affected)
    }

    /// Runs a raw SQL query against the store.
    pub async fn execute_raw(&self, sql: &str, parameters: &[SqlParameter]) -> Result<DataTable> {
        self.store.execute_raw(sql, parameters).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;
    use repokit_core::specification::{field, OrderOption};
    use repokit_core::storage::Relation;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Author {
        id: u32,
        name: String,
        #[serde(default)]
        posts: Vec<Post>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Post {
        id: u32,
        author_id: u32,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        author: Option<Box<Author>>,
    }

    const AUTHOR_RELATIONS: &[Relation] = &[Relation {
        name: "posts",
        table: "posts",
        local_field: "id",
        foreign_field: "author_id",
        cardinality: Cardinality::Many,
        relations: post_relations,
    }];

    const POST_RELATIONS: &[Relation] = &[Relation {
        name: "author",
        table: "authors",
        local_field: "author_id",
        foreign_field: "id",
        cardinality: Cardinality::One,
        relations: author_relations,
    }];

    fn author_relations() -> &'static [Relation] {
        AUTHOR_RELATIONS
    }

    fn post_relations() -> &'static [Relation] {
        POST_RELATIONS
    }

    impl Entity for Author {
        const TABLE: &'static str = "authors";

        fn key(&self) -> String {
            self.id.to_string()
        }

        fn relations() -> &'static [Relation] {
            AUTHOR_RELATIONS
        }
    }

    impl Entity for Post {
        const TABLE: &'static str = "posts";

        fn key(&self) -> String {
            self.id.to_string()
        }

        fn relations() -> &'static [Relation] {
            POST_RELATIONS
        }
    }

    fn author(id: u32) -> Author {
        Author {
            id,
            name: format!("author {id}"),
            posts: Vec::new(),
        }
    }

    fn post(id: u32, author_id: u32) -> Post {
        Post {
            id,
            author_id,
            title: format!("post {id}"),
            author: None,
        }
    }

    async fn seeded() -> DbContext<InMemoryStore> {
        let context = DbContext::new(Arc::new(InMemoryStore::new()));
        for id in 1..=2 {
            context.add(&author(id)).await.unwrap();
        }
        for (id, author_id) in [(1, 1), (2, 1), (3, 2)] {
            context.add(&post(id, author_id)).await.unwrap();
        }
        context.save_changes().await.unwrap();
        context.clear_tracker().await;
        context
    }

    #[tokio::test]
    async fn test_tracking_query_attaches_unchanged() {
        let context = seeded().await;

        let authors = context.to_list(&context.set::<Author>()).await.unwrap();

        assert_eq!(authors.len(), 2);
        assert_eq!(context.entry(&authors[0]).await.state, EntityState::Unchanged);
    }

    #[tokio::test]
    async fn test_no_tracking_query_leaves_tracker_empty() {
        let context = seeded().await;

        let query = context.set::<Author>().as_no_tracking();
        let authors = context.to_list(&query).await.unwrap();

        assert_eq!(context.entry(&authors[0]).await.state, EntityState::Detached);
        assert!(context.tracked_entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_include_many() {
        let context = seeded().await;

        let query = context.set::<Author>().include_path("posts");
        let authors = context.to_list(&query).await.unwrap();

        assert_eq!(authors[0].posts.len(), 2);
        assert_eq!(authors[1].posts.len(), 1);
    }

    #[tokio::test]
    async fn test_include_nested_path() {
        let context = seeded().await;

        let query = context
            .set::<Post>()
            .filter(&field("id").eq(3))
            .include_path("author.posts");
        let posts = context.to_list(&query).await.unwrap();

        let author = posts[0].author.as_ref().expect("author should be loaded");
        assert_eq!(author.id, 2);
        assert_eq!(author.posts.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_navigation_is_invalid_argument() {
        let context = seeded().await;

        let query = context.set::<Post>().include_path("comments");
        let result = context.to_list(&query).await;

        assert!(matches!(result, Err(RepositoryError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_navigations_are_not_persisted() {
        let context = seeded().await;

        let query = context.set::<Author>().include_path("posts");
        let mut loaded = context.first(&query).await.unwrap().unwrap();
        loaded.name = "renamed".to_string();
        context.update(&loaded).await.unwrap();
        context.save_changes().await.unwrap();

        let rows = context
            .store()
            .fetch(&QueryPlan::new("authors"))
            .await
            .unwrap();
        assert_eq!(rows[0]["name"], "renamed");
        assert!(rows[0].get("posts").is_none());
    }

    #[tokio::test]
    async fn test_paged_response_counts_before_paging() {
        let context = seeded().await;

        let query: Query<Post> = context
            .set::<Post>()
            .order_by(&OrderOption::desc("id"))
            .into();
        let response = context
            .to_paged_response(query, Some(&PagingOptions::new(1, 2)))
            .await
            .unwrap();
        let posts = context.to_list(&response.query).await.unwrap();

        assert_eq!(response.total_count, 3);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, 1);
    }

    #[tokio::test]
    async fn test_save_changes_lifecycle() {
        let context = seeded().await;

        let entry = context.add(&author(3)).await.unwrap();
        assert_eq!(entry.state, EntityState::Added);

        assert_eq!(context.save_changes().await.unwrap(), 1);
        assert_eq!(context.entry(&author(3)).await.state, EntityState::Unchanged);

        context.remove(&author(3)).await;
        assert_eq!(context.save_changes().await.unwrap(), 1);
        assert_eq!(context.entry(&author(3)).await.state, EntityState::Detached);
        assert_eq!(context.count(&context.set::<Author>()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_staged_changes() {
        let context = seeded().await;

        context.add(&author(4)).await.unwrap();
        context.remove(&author(99)).await;
        let result = context.save_changes().await;

        assert!(matches!(result, Err(RepositoryError::Concurrency { .. })));
        assert_eq!(context.entry(&author(4)).await.state, EntityState::Added);
        assert_eq!(context.count(&context.set::<Author>()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_save_without_changes_is_zero() {
        let context = seeded().await;
        assert_eq!(context.save_changes().await.unwrap(), 0);

        // Loaded but unmodified entities stay out of the commit
        context.to_list(&context.set::<Author>()).await.unwrap();
        assert!(!context.tracked_entries().await.is_empty());
        assert_eq!(context.save_changes().await.unwrap(), 0);
    }
}
