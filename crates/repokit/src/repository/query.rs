//! Query repository over a shared [`DbContext`].

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use repokit_core::query::{apply_specification, Query};
use repokit_core::specification::{PagedData, PagingOptions, QuerySpecification, Selector};
use repokit_core::storage::{
    DataTable, Entity, Projection, QueryRepository, RepositoryError, Result, Selection,
    SqlParameter, Store,
};

use crate::context::DbContext;

/// Rejects selectors whose description is blank, since the description
/// identifies the projection in cache keys.
pub(crate) fn ensure_described<T, V>(selector: &Selector<T, V>) -> Result<()> {
    if selector.description().trim().is_empty() {
        return Err(RepositoryError::InvalidArgument(
            "selector description must not be blank".to_string(),
        ));
    }
    Ok(())
}

/// Default [`QueryRepository`] implementation.
///
/// Entity reads follow the specification's tracking flag. Projected and
/// selected reads never track.
pub struct DbQueryRepository<T, S> {
    context: Arc<DbContext<S>>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity, S: Store> DbQueryRepository<T, S> {
    pub fn new(context: Arc<DbContext<S>>) -> Self {
        Self {
            context,
            _entity: PhantomData,
        }
    }

    pub fn context(&self) -> &Arc<DbContext<S>> {
        &self.context
    }

    /// Builds the query a specification describes over all entities of `T`.
    pub fn filtered_query(&self, spec: Option<&QuerySpecification<T>>) -> Query<T> {
        apply_specification(self.context.set::<T>(), spec)
    }

    /// Pages an arbitrary query: counts it, then loads one page of it.
    pub async fn page_query(
        &self,
        query: Query<T>,
        paging: Option<&PagingOptions>,
    ) -> Result<PagedData<T>> {
        let response = self.context.to_paged_response(query, paging).await?;
        let data = self.context.to_list(&response.query).await?;
        Ok(PagedData::new(Some(data), response.total_count))
    }

    /// Like [`page_query`](Self::page_query), mapping every entity to `R`.
    pub async fn page_query_as<R: Projection<T>>(
        &self,
        query: Query<T>,
        paging: Option<&PagingOptions>,
    ) -> Result<PagedData<R>> {
        let page = self.page_query(query.as_no_tracking(), paging).await?;
        Ok(page.map(R::from))
    }

    fn untracked_query(&self, spec: Option<&QuerySpecification<T>>) -> Query<T> {
        self.filtered_query(spec).as_no_tracking()
    }
}

impl<T, S> Clone for DbQueryRepository<T, S> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<T, S> QueryRepository<T> for DbQueryRepository<T, S>
where
    T: Entity,
    S: Store + 'static,
{
    async fn find(&self, spec: Option<&QuerySpecification<T>>) -> Result<Option<T>> {
        self.context.first(&self.filtered_query(spec)).await
    }

    async fn find_select<V: Selection>(
        &self,
        spec: Option<&QuerySpecification<T>>,
        selector: &Selector<T, V>,
    ) -> Result<Option<V>> {
        ensure_described(selector)?;
        let entity = self.context.first(&self.untracked_query(spec)).await?;
        Ok(entity.map(|entity| selector.apply(&entity)))
    }

    async fn find_as<R: Projection<T>>(
        &self,
        spec: Option<&QuerySpecification<T>>,
    ) -> Result<Option<R>> {
        let entity = self.context.first(&self.untracked_query(spec)).await?;
        Ok(entity.map(R::from))
    }

    async fn get_list(&self, spec: Option<&QuerySpecification<T>>) -> Result<Vec<T>> {
        self.context.to_list(&self.filtered_query(spec)).await
    }

    async fn get_list_select<V: Selection>(
        &self,
        spec: Option<&QuerySpecification<T>>,
        selector: &Selector<T, V>,
    ) -> Result<Vec<V>> {
        ensure_described(selector)?;
        let entities = self.context.to_list(&self.untracked_query(spec)).await?;
        Ok(entities.iter().map(|entity| selector.apply(entity)).collect())
    }

    async fn get_list_as<R: Projection<T>>(
        &self,
        spec: Option<&QuerySpecification<T>>,
    ) -> Result<Vec<R>> {
        let entities = self.context.to_list(&self.untracked_query(spec)).await?;
        Ok(entities.into_iter().map(R::from).collect())
    }

    async fn get_page(
        &self,
        spec: Option<&QuerySpecification<T>>,
        paging: Option<&PagingOptions>,
    ) -> Result<PagedData<T>> {
        self.page_query(self.filtered_query(spec), paging).await
    }

    async fn get_page_as<R: Projection<T>>(
        &self,
        spec: Option<&QuerySpecification<T>>,
        paging: Option<&PagingOptions>,
    ) -> Result<PagedData<R>> {
        self.page_query_as(self.filtered_query(spec), paging).await
    }

    async fn get_raw(&self, sql: &str, parameters: &[SqlParameter]) -> Result<DataTable> {
        self.context.execute_raw(sql, parameters).await
    }
}
