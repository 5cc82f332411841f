use std::sync::Arc;

use repokit_core::cache::Cache;
use repokit_core::storage::{Entity, Store};

use super::{CachedQueryRepository, DbCommandRepository, DbQueryRepository};
use crate::config::CacheExpiryProvider;
use crate::context::DbContext;

/// Hands out repositories that share one context, one cache and one expiry
/// provider.
pub struct Repositories<S, C> {
    context: Arc<DbContext<S>>,
    cache: Arc<C>,
    expiry: Arc<dyn CacheExpiryProvider>,
}

impl<S, C> Repositories<S, C>
where
    S: Store + 'static,
    C: Cache + 'static,
{
    pub fn new(
        context: Arc<DbContext<S>>,
        cache: Arc<C>,
        expiry: Arc<dyn CacheExpiryProvider>,
    ) -> Self {
        Self {
            context,
            cache,
            expiry,
        }
    }

    pub fn context(&self) -> &Arc<DbContext<S>> {
        &self.context
    }

    pub fn query<T: Entity>(&self) -> DbQueryRepository<T, S> {
        DbQueryRepository::new(Arc::clone(&self.context))
    }

    pub fn command<T: Entity>(&self) -> DbCommandRepository<T, S> {
        DbCommandRepository::new(Arc::clone(&self.context))
    }

    pub fn cached_query<T: Entity>(&self) -> CachedQueryRepository<T, DbQueryRepository<T, S>, C> {
        CachedQueryRepository::new(
            Arc::new(self.query()),
            Arc::clone(&self.cache),
            self.expiry.as_ref(),
        )
    }
}

impl<S, C> Clone for Repositories<S, C> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            cache: Arc::clone(&self.cache),
            expiry: Arc::clone(&self.expiry),
        }
    }
}
