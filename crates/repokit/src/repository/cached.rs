//! Cached query repository decorator.
//!
//! Wraps a `QueryRepository` with a read-through cache keyed by the
//! specification's canonical signature.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use repokit_core::cache::{
    deserialize_present, paging_extension, raw_sql_key, serialize_value, specification_key, Cache,
    CacheError,
};
use repokit_core::specification::{PagedData, PagingOptions, QuerySpecification, Selector};
use repokit_core::storage::{
    DataTable, Entity, Projection, QueryRepository, Result, Selection, SqlParameter,
};

use super::query::ensure_described;
use crate::config::CacheExpiryProvider;

/// Expiry used when the provider has none configured.
pub const DEFAULT_CACHE_EXPIRY_SECS: u64 = 1200;

/// Cached query repository decorator.
///
/// - **Hit**: a stored non-null value is returned without touching the
///   inner repository
/// - **Miss**: the inner result is stored with the configured expiry
///
/// Raw SQL results are stored without expiry. Concurrent misses on the same
/// key each call the inner repository.
///
/// # Type Parameters
///
/// * `T` - The entity type
/// * `Q` - The wrapped repository
/// * `C` - The cache implementation
pub struct CachedQueryRepository<T, Q, C> {
    inner: Arc<Q>,
    cache: Arc<C>,
    ttl: Duration,
    _entity: PhantomData<fn() -> T>,
}

impl<T, Q, C> CachedQueryRepository<T, Q, C>
where
    T: Entity,
    Q: QueryRepository<T>,
    C: Cache,
{
    /// Creates a new cached query repository.
    ///
    /// The expiry is read from `expiry` once, here.
    pub fn new(inner: Arc<Q>, cache: Arc<C>, expiry: &dyn CacheExpiryProvider) -> Self {
        let secs = expiry
            .cache_expiry_secs()
            .unwrap_or(DEFAULT_CACHE_EXPIRY_SECS);
        Self {
            inner,
            cache,
            ttl: Duration::from_secs(secs),
            _entity: PhantomData,
        }
    }

    pub fn cache_expiry(&self) -> Duration {
        self.ttl
    }

    async fn get_or_fetch<V, F>(&self, key: String, ttl: Option<Duration>, fetch: F) -> Result<V>
    where
        V: Serialize + DeserializeOwned + Send,
        F: Future<Output = Result<V>> + Send,
    {
        if let Some(bytes) = self.cache.get(&key).await? {
            match deserialize_present::<V>(&bytes) {
                Ok(Some(value)) => {
                    tracing::trace!(key = %key, "Cache hit");
                    return Ok(value);
                }
                Ok(None) => {}
                Err(err) => {
                    // Treated as a miss; the entry gets overwritten below
                    tracing::warn!(key = %key, error = %err, "Cached value could not be decoded");
                }
            }
        }

        tracing::trace!(key = %key, "Cache miss");
        let value = fetch.await?;

        let bytes = serialize_value(&value).map_err(CacheError::from)?;
        self.cache.set(&key, &bytes, ttl).await?;
        Ok(value)
    }
}

#[async_trait]
impl<T, Q, C> QueryRepository<T> for CachedQueryRepository<T, Q, C>
where
    T: Entity,
    Q: QueryRepository<T> + 'static,
    C: Cache + 'static,
{
    async fn find(&self, spec: Option<&QuerySpecification<T>>) -> Result<Option<T>> {
        let key = specification_key::<T, Option<T>>(spec, None);
        self.get_or_fetch(key, Some(self.ttl), self.inner.find(spec))
            .await
    }

    async fn find_select<V: Selection>(
        &self,
        spec: Option<&QuerySpecification<T>>,
        selector: &Selector<T, V>,
    ) -> Result<Option<V>> {
        ensure_described(selector)?;
        let key = specification_key::<T, Option<V>>(spec, Some(selector.description()));
        self.get_or_fetch(key, Some(self.ttl), self.inner.find_select(spec, selector))
            .await
    }

    async fn find_as<R: Projection<T>>(
        &self,
        spec: Option<&QuerySpecification<T>>,
    ) -> Result<Option<R>> {
        let key = specification_key::<T, Option<R>>(spec, None);
        self.get_or_fetch(key, Some(self.ttl), self.inner.find_as::<R>(spec))
            .await
    }

    async fn get_list(&self, spec: Option<&QuerySpecification<T>>) -> Result<Vec<T>> {
        let key = specification_key::<T, Vec<T>>(spec, None);
        self.get_or_fetch(key, Some(self.ttl), self.inner.get_list(spec))
            .await
    }

    async fn get_list_select<V: Selection>(
        &self,
        spec: Option<&QuerySpecification<T>>,
        selector: &Selector<T, V>,
    ) -> Result<Vec<V>> {
        ensure_described(selector)?;
        let key = specification_key::<T, Vec<V>>(spec, Some(selector.description()));
        self.get_or_fetch(
            key,
            Some(self.ttl),
            self.inner.get_list_select(spec, selector),
        )
        .await
    }

    async fn get_list_as<R: Projection<T>>(
        &self,
        spec: Option<&QuerySpecification<T>>,
    ) -> Result<Vec<R>> {
        let key = specification_key::<T, Vec<R>>(spec, None);
        self.get_or_fetch(key, Some(self.ttl), self.inner.get_list_as::<R>(spec))
            .await
    }

    async fn get_page(
        &self,
        spec: Option<&QuerySpecification<T>>,
        paging: Option<&PagingOptions>,
    ) -> Result<PagedData<T>> {
        let extension = paging_extension(paging);
        let key = specification_key::<T, PagedData<T>>(spec, Some(&extension));
        self.get_or_fetch(key, Some(self.ttl), self.inner.get_page(spec, paging))
            .await
    }

    async fn get_page_as<R: Projection<T>>(
        &self,
        spec: Option<&QuerySpecification<T>>,
        paging: Option<&PagingOptions>,
    ) -> Result<PagedData<R>> {
        let extension = paging_extension(paging);
        let key = specification_key::<T, PagedData<R>>(spec, Some(&extension));
        self.get_or_fetch(
            key,
            Some(self.ttl),
            self.inner.get_page_as::<R>(spec, paging),
        )
        .await
    }

    async fn get_raw(&self, sql: &str, parameters: &[SqlParameter]) -> Result<DataTable> {
        let key = raw_sql_key(sql, parameters);
        self.get_or_fetch(key, None, self.inner.get_raw(sql, parameters))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::RwLock;

    use repokit_core::cache::Result as CacheResult;
    use repokit_core::specification::{field, OrderOption};
    use repokit_core::storage::RepositoryError;
    use serde::Deserialize;

    use crate::config::ConfigCacheExpiryProvider;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Link {
        id: u32,
        category_id: u32,
    }

    impl Entity for Link {
        const TABLE: &'static str = "links";

        fn key(&self) -> String {
            self.id.to_string()
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct LinkId(u32);

    impl From<Link> for LinkId {
        fn from(link: Link) -> Self {
            Self(link.id)
        }
    }

    struct MockQueryRepository {
        links: Vec<Link>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl MockQueryRepository {
        fn new(count: u32) -> Self {
            Self {
                links: (1..=count)
                    .map(|id| Link {
                        id,
                        category_id: id,
                    })
                    .collect(),
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(0)
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn list(&self) -> Result<Vec<Link>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RepositoryError::ConnectionFailed("down".to_string()));
            }
            Ok(self.links.clone())
        }
    }

    #[async_trait]
    impl QueryRepository<Link> for MockQueryRepository {
        async fn find(&self, _spec: Option<&QuerySpecification<Link>>) -> Result<Option<Link>> {
            Ok(self.list()?.into_iter().next())
        }

        async fn find_select<V: Selection>(
            &self,
            _spec: Option<&QuerySpecification<Link>>,
            selector: &Selector<Link, V>,
        ) -> Result<Option<V>> {
            Ok(self.list()?.first().map(|l| selector.apply(l)))
        }

        async fn find_as<R: Projection<Link>>(
            &self,
            _spec: Option<&QuerySpecification<Link>>,
        ) -> Result<Option<R>> {
            Ok(self.list()?.into_iter().next().map(R::from))
        }

        async fn get_list(&self, _spec: Option<&QuerySpecification<Link>>) -> Result<Vec<Link>> {
            self.list()
        }

        async fn get_list_select<V: Selection>(
            &self,
            _spec: Option<&QuerySpecification<Link>>,
            selector: &Selector<Link, V>,
        ) -> Result<Vec<V>> {
            Ok(self.list()?.iter().map(|l| selector.apply(l)).collect())
        }

        async fn get_list_as<R: Projection<Link>>(
            &self,
            _spec: Option<&QuerySpecification<Link>>,
        ) -> Result<Vec<R>> {
            Ok(self.list()?.into_iter().map(R::from).collect())
        }

        async fn get_page(
            &self,
            _spec: Option<&QuerySpecification<Link>>,
            paging: Option<&PagingOptions>,
        ) -> Result<PagedData<Link>> {
            let paging = paging.copied().unwrap_or_default();
            let links = self.list()?;
            let total = links.len();
            let data = links
                .into_iter()
                .skip(paging.skip())
                .take(paging.page_size)
                .collect();
            Ok(PagedData::new(Some(data), total))
        }

        async fn get_page_as<R: Projection<Link>>(
            &self,
            spec: Option<&QuerySpecification<Link>>,
            paging: Option<&PagingOptions>,
        ) -> Result<PagedData<R>> {
            Ok(self.get_page(spec, paging).await?.map(R::from))
        }

        async fn get_raw(&self, _sql: &str, _parameters: &[SqlParameter]) -> Result<DataTable> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(DataTable {
                columns: vec!["n".to_string()],
                rows: vec![vec![serde_json::json!(1)]],
            })
        }
    }

    struct MockCache {
        store: RwLock<HashMap<String, (Vec<u8>, Option<Duration>)>>,
        set_calls: AtomicUsize,
    }

    impl MockCache {
        fn new() -> Self {
            Self {
                store: RwLock::new(HashMap::new()),
                set_calls: AtomicUsize::new(0),
            }
        }

        fn set_calls(&self) -> usize {
            self.set_calls.load(Ordering::SeqCst)
        }

        async fn ttl_of(&self, key: &str) -> Option<Option<Duration>> {
            self.store.read().await.get(key).map(|(_, ttl)| *ttl)
        }

        async fn insert_raw(&self, key: &str, bytes: &[u8]) {
            self.store
                .write()
                .await
                .insert(key.to_string(), (bytes.to_vec(), None));
        }
    }

    #[async_trait]
    impl Cache for MockCache {
        async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
            Ok(self
                .store
                .read()
                .await
                .get(key)
                .map(|(bytes, _)| bytes.clone()))
        }

        async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> CacheResult<()> {
            self.set_calls.fetch_add(1, Ordering::SeqCst);
            self.store
                .write()
                .await
                .insert(key.to_string(), (value.to_vec(), ttl));
            Ok(())
        }
    }

    struct FailingCache;

    #[async_trait]
    impl Cache for FailingCache {
        async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
            Err(CacheError::OperationFailed("unreachable".to_string()))
        }

        async fn set(&self, _key: &str, _value: &[u8], _ttl: Option<Duration>) -> CacheResult<()> {
            Err(CacheError::OperationFailed("unreachable".to_string()))
        }
    }

    struct FixedExpiry(Option<u64>);

    impl CacheExpiryProvider for FixedExpiry {
        fn cache_expiry_secs(&self) -> Option<u64> {
            self.0
        }
    }

    fn cached(
        inner: &Arc<MockQueryRepository>,
        cache: &Arc<MockCache>,
    ) -> CachedQueryRepository<Link, MockQueryRepository, MockCache> {
        CachedQueryRepository::new(Arc::clone(inner), Arc::clone(cache), &FixedExpiry(Some(10)))
    }

    fn spec() -> QuerySpecification<Link> {
        QuerySpecification::with_filter(field("category_id").gt(10))
            .apply_order_by([OrderOption::desc("category_id")])
    }

    #[tokio::test]
    async fn test_cache_miss_calls_inner_and_stores_once() {
        let inner = Arc::new(MockQueryRepository::new(3));
        let cache = Arc::new(MockCache::new());
        let repository = cached(&inner, &cache);
        let spec = spec();

        let links = repository.get_list(Some(&spec)).await.unwrap();

        assert_eq!(links.len(), 3);
        assert_eq!(inner.calls(), 1);
        assert_eq!(cache.set_calls(), 1);
        let key = specification_key::<Link, Vec<Link>>(Some(&spec), None);
        assert_eq!(
            cache.ttl_of(&key).await,
            Some(Some(Duration::from_secs(10)))
        );
    }

    #[tokio::test]
    async fn test_cache_hit_skips_inner() {
        let inner = Arc::new(MockQueryRepository::new(3));
        let cache = Arc::new(MockCache::new());
        let repository = cached(&inner, &cache);
        let spec = spec();

        let first = repository.get_list(Some(&spec)).await.unwrap();
        let second = repository.get_list(Some(&spec)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(inner.calls(), 1);
        assert_eq!(cache.set_calls(), 1);
    }

    #[tokio::test]
    async fn test_different_specifications_use_different_keys() {
        let inner = Arc::new(MockQueryRepository::new(3));
        let cache = Arc::new(MockCache::new());
        let repository = cached(&inner, &cache);

        repository.get_list(Some(&spec())).await.unwrap();
        repository
            .get_list(Some(&spec().as_non_tracking()))
            .await
            .unwrap();

        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn test_null_entry_is_a_miss() {
        let inner = Arc::new(MockQueryRepository::new(0));
        let cache = Arc::new(MockCache::new());
        let repository = cached(&inner, &cache);

        assert_eq!(repository.find(None).await.unwrap(), None);
        assert_eq!(repository.find(None).await.unwrap(), None);

        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let inner = Arc::new(MockQueryRepository::new(2));
        let cache = Arc::new(MockCache::new());
        let repository = cached(&inner, &cache);
        let spec = spec();
        let key = specification_key::<Link, Vec<Link>>(Some(&spec), None);
        cache.insert_raw(&key, b"not json").await;

        let links = repository.get_list(Some(&spec)).await.unwrap();

        assert_eq!(links.len(), 2);
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test]
    async fn test_inner_failure_is_not_cached() {
        let inner = Arc::new(MockQueryRepository::failing());
        let cache = Arc::new(MockCache::new());
        let repository = cached(&inner, &cache);

        let result = repository.get_list(None).await;

        assert!(matches!(result, Err(RepositoryError::ConnectionFailed(_))));
        assert_eq!(cache.set_calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_failure_propagates() {
        let inner = Arc::new(MockQueryRepository::new(1));
        let repository: CachedQueryRepository<Link, _, _> = CachedQueryRepository::new(
            Arc::clone(&inner),
            Arc::new(FailingCache),
            &FixedExpiry(None),
        );

        let result = repository.get_list(None).await;

        assert!(matches!(result, Err(RepositoryError::Cache(_))));
        assert_eq!(inner.calls(), 0);
    }

    #[tokio::test]
    async fn test_selector_description_extends_key() {
        let inner = Arc::new(MockQueryRepository::new(2));
        let cache = Arc::new(MockCache::new());
        let repository = cached(&inner, &cache);
        let spec = spec();
        let ids = Selector::new("x => x.id", |l: &Link| l.id);
        let categories = Selector::new("x => x.category_id", |l: &Link| l.category_id);

        repository.get_list_select(Some(&spec), &ids).await.unwrap();
        repository
            .get_list_select(Some(&spec), &categories)
            .await
            .unwrap();
        repository.get_list_select(Some(&spec), &ids).await.unwrap();

        assert_eq!(inner.calls(), 2);
        let key = specification_key::<Link, Vec<u32>>(Some(&spec), Some("x => x.id"));
        assert!(cache.ttl_of(&key).await.is_some());
    }

    #[tokio::test]
    async fn test_blank_selector_is_rejected_before_cache() {
        let inner = Arc::new(MockQueryRepository::new(2));
        let cache = Arc::new(MockCache::new());
        let repository = cached(&inner, &cache);
        let selector = Selector::new("", |l: &Link| l.id);

        let result = repository.find_select(None, &selector).await;

        assert!(matches!(result, Err(RepositoryError::InvalidArgument(_))));
        assert_eq!(inner.calls(), 0);
    }

    #[tokio::test]
    async fn test_pages_are_cached_per_paging_options() {
        let inner = Arc::new(MockQueryRepository::new(15));
        let cache = Arc::new(MockCache::new());
        let repository = cached(&inner, &cache);
        let spec = spec();

        let page = repository
            .get_page(Some(&spec), Some(&PagingOptions::new(2, 3)))
            .await
            .unwrap();
        repository
            .get_page(Some(&spec), Some(&PagingOptions::new(2, 3)))
            .await
            .unwrap();
        repository.get_page(Some(&spec), None).await.unwrap();

        assert_eq!(page.total_items, 15);
        assert_eq!(inner.calls(), 2);
        let key = specification_key::<Link, PagedData<Link>>(
            Some(&spec),
            Some("PagingOptions_Index:0_Size:10"),
        );
        assert!(cache.ttl_of(&key).await.is_some());
    }

    #[tokio::test]
    async fn test_projection_and_entity_keys_differ_without_spec() {
        let inner = Arc::new(MockQueryRepository::new(2));
        let cache = Arc::new(MockCache::new());
        let repository = cached(&inner, &cache);

        let links = repository.get_list(None).await.unwrap();
        let ids: Vec<LinkId> = repository.get_list_as(None).await.unwrap();

        assert_eq!(links.len(), 2);
        assert_eq!(ids, vec![LinkId(1), LinkId(2)]);
        assert_eq!(inner.calls(), 2);
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct ScaledLink {
        id: u32,
        category_id: u32,
    }

    impl From<Link> for ScaledLink {
        fn from(link: Link) -> Self {
            Self {
                id: link.id,
                category_id: link.category_id * 100,
            }
        }
    }

    #[tokio::test]
    async fn test_projection_after_entity_read_with_same_spec_is_projected() {
        let inner = Arc::new(MockQueryRepository::new(2));
        let cache = Arc::new(MockCache::new());
        let repository = cached(&inner, &cache);
        let spec = spec();

        repository.get_list(Some(&spec)).await.unwrap();
        let scaled: Vec<ScaledLink> = repository.get_list_as(Some(&spec)).await.unwrap();
        let first: Option<ScaledLink> = repository.find_as(Some(&spec)).await.unwrap();
        let page: PagedData<ScaledLink> =
            repository.get_page_as(Some(&spec), None).await.unwrap();

        let expected = vec![
            ScaledLink { id: 1, category_id: 100 },
            ScaledLink { id: 2, category_id: 200 },
        ];
        assert_eq!(scaled, expected);
        assert_eq!(first, Some(expected[0].clone()));
        assert_eq!(page.data, expected);
        assert_eq!(inner.calls(), 4);
    }

    #[tokio::test]
    async fn test_raw_sql_is_stored_without_expiry() {
        let inner = Arc::new(MockQueryRepository::new(0));
        let cache = Arc::new(MockCache::new());
        let repository = cached(&inner, &cache);
        let parameters = [SqlParameter::new("id", 1)];

        repository.get_raw("SELECT 1", &parameters).await.unwrap();
        repository.get_raw("SELECT 1", &parameters).await.unwrap();

        assert_eq!(inner.calls(), 1);
        assert_eq!(
            cache.ttl_of(&raw_sql_key("SELECT 1", &parameters)).await,
            Some(None)
        );
    }

    #[test]
    fn test_expiry_defaults_when_unconfigured() {
        let inner = Arc::new(MockQueryRepository::new(0));
        let cache = Arc::new(MockCache::new());
        let provider = ConfigCacheExpiryProvider::default();

        let repository: CachedQueryRepository<Link, _, _> =
            CachedQueryRepository::new(inner, cache, &provider);

        assert_eq!(
            repository.cache_expiry(),
            Duration::from_secs(DEFAULT_CACHE_EXPIRY_SECS)
        );
    }

    #[test]
    fn test_expiry_from_provider() {
        let inner = Arc::new(MockQueryRepository::new(0));
        let cache = Arc::new(MockCache::new());

        let repository: CachedQueryRepository<Link, _, _> =
            CachedQueryRepository::new(inner, cache, &FixedExpiry(Some(10)));

        assert_eq!(repository.cache_expiry(), Duration::from_secs(10));
    }
}
