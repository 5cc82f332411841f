use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use repokit_core::specification::Filter;
use repokit_core::storage::{CommandRepository, Entity, EntityEntry, Result, Store};

use crate::context::DbContext;

/// Default [`CommandRepository`] implementation.
///
/// Writes are staged on the shared context; `save_changes` commits the
/// changes of every repository built on that context.
pub struct DbCommandRepository<T, S> {
    context: Arc<DbContext<S>>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity, S: Store> DbCommandRepository<T, S> {
    pub fn new(context: Arc<DbContext<S>>) -> Self {
        Self {
            context,
            _entity: PhantomData,
        }
    }

    pub fn context(&self) -> &Arc<DbContext<S>> {
        &self.context
    }
}

impl<T, S> Clone for DbCommandRepository<T, S> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<T, S> CommandRepository<T> for DbCommandRepository<T, S>
where
    T: Entity,
    S: Store + 'static,
{
    async fn add(&self, entity: T) -> Result<EntityEntry> {
        self.context.add(&entity).await
    }

    async fn add_range(&self, entities: Vec<T>) -> Result<()> {
        for entity in &entities {
            self.context.add(entity).await?;
        }
        Ok(())
    }

    async fn delete(&self, entity: &T) -> Result<()> {
        self.context.remove(entity).await;
        Ok(())
    }

    async fn delete_range(&self, entities: &[T]) -> Result<()> {
        for entity in entities {
            self.context.remove(entity).await;
        }
        Ok(())
    }

    async fn delete_where(&self, filter: &Filter<T>) -> Result<usize> {
        let query = self.context.set::<T>().filter(filter);
        let matches = self.context.to_list(&query).await?;
        for entity in &matches {
            self.context.remove(entity).await;
        }
        tracing::debug!(table = T::TABLE, staged = matches.len(), "Deletes staged");
        Ok(matches.len())
    }

    async fn update(&self, entity: T) -> Result<()> {
        self.context.update(&entity).await?;
        Ok(())
    }

    async fn save_changes(&self) -> Result<usize> {
        self.context.save_changes().await
    }
}
