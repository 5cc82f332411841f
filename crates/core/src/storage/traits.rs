use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::query::QueryPlan;
use crate::specification::{Filter, PagedData, PagingOptions, QuerySpecification, Selector};

use super::{Change, DataTable, Entity, EntityEntry, Result, SqlParameter};

/// A projection target built from an entity.
pub trait Projection<T>: From<T> + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T, R> Projection<T> for R where R: From<T> + Serialize + DeserializeOwned + Send + Sync + 'static
{}

/// Output of a [`Selector`].
pub trait Selection: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<S> Selection for S where S: Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Row storage behind a unit of work.
///
/// Rows are JSON objects keyed by a string primary key within a table.
#[async_trait]
pub trait Store: Send + Sync {
    /// Creates the table if it does not exist yet.
    async fn ensure_table(&self, table: &str) -> Result<()>;

    /// Returns the rows of `plan.table` that satisfy the plan, in plan order.
    async fn fetch(&self, plan: &QueryPlan) -> Result<Vec<Value>>;

    /// Counts the rows matching the plan's filters. Ordering and window are ignored.
    async fn count(&self, plan: &QueryPlan) -> Result<usize>;

    /// Applies all changes atomically and returns the number of rows affected.
    async fn commit(&self, changes: &[Change]) -> Result<usize>;

    /// Runs a raw SQL query with named parameters.
    async fn execute_raw(&self, sql: &str, parameters: &[SqlParameter]) -> Result<DataTable>;
}

/// Read operations over entities of type `T`.
///
/// A `None` specification means no constraints.
#[async_trait]
pub trait QueryRepository<T: Entity>: Send + Sync {
    /// Returns the first entity matching the specification.
    async fn find(&self, spec: Option<&QuerySpecification<T>>) -> Result<Option<T>>;

    /// Returns the selector's projection of the first matching entity.
    async fn find_select<S: Selection>(
        &self,
        spec: Option<&QuerySpecification<T>>,
        selector: &Selector<T, S>,
    ) -> Result<Option<S>>;

    /// Returns the first matching entity mapped to `R`.
    async fn find_as<R: Projection<T>>(
        &self,
        spec: Option<&QuerySpecification<T>>,
    ) -> Result<Option<R>>;

    /// Returns every entity matching the specification.
    async fn get_list(&self, spec: Option<&QuerySpecification<T>>) -> Result<Vec<T>>;

    /// Returns the selector's projection of every matching entity.
    async fn get_list_select<S: Selection>(
        &self,
        spec: Option<&QuerySpecification<T>>,
        selector: &Selector<T, S>,
    ) -> Result<Vec<S>>;

    /// Returns every matching entity mapped to `R`.
    async fn get_list_as<R: Projection<T>>(
        &self,
        spec: Option<&QuerySpecification<T>>,
    ) -> Result<Vec<R>>;

    /// Returns one page of matching entities and the total match count.
    async fn get_page(
        &self,
        spec: Option<&QuerySpecification<T>>,
        paging: Option<&PagingOptions>,
    ) -> Result<PagedData<T>>;

    /// Returns one page of matching entities mapped to `R` and the total match count.
    async fn get_page_as<R: Projection<T>>(
        &self,
        spec: Option<&QuerySpecification<T>>,
        paging: Option<&PagingOptions>,
    ) -> Result<PagedData<R>>;

    /// Runs a raw SQL query.
    async fn get_raw(&self, sql: &str, parameters: &[SqlParameter]) -> Result<DataTable>;
}

/// Write operations over entities of type `T`.
///
/// Writes are staged on a shared unit of work and persisted by
/// [`save_changes`](Self::save_changes).
#[async_trait]
pub trait CommandRepository<T: Entity>: Send + Sync {
    /// Stages an insert.
    async fn add(&self, entity: T) -> Result<EntityEntry>;

    /// Stages an insert per entity.
    async fn add_range(&self, entities: Vec<T>) -> Result<()>;

    /// Stages a delete. Deleting an entity that was only added unstages it.
    async fn delete(&self, entity: &T) -> Result<()>;

    /// Stages a delete per entity.
    async fn delete_range(&self, entities: &[T]) -> Result<()>;

    /// Loads every entity matching `filter` and stages a delete for each.
    /// Returns how many were staged.
    async fn delete_where(&self, filter: &Filter<T>) -> Result<usize>;

    /// Stages an update.
    async fn update(&self, entity: T) -> Result<()>;

    /// Persists everything staged on the unit of work and returns the number
    /// of rows written.
    async fn save_changes(&self) -> Result<usize>;
}
