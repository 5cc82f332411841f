use crate::specification::PagingOptions;

use super::Query;

/// Restricts `query` to one page. `None` means the first page of the default size.
pub fn page<T>(query: Query<T>, paging: Option<&PagingOptions>) -> Query<T> {
    let paging = paging.copied().unwrap_or_default();
    query.skip(paging.skip()).take(paging.page_size)
}

/// A query split into its unpaged form, used for counting, and its paged form.
pub struct PagedQuery<T> {
    pub count_query: Query<T>,
    pub query: Query<T>,
}

impl<T> PagedQuery<T> {
    pub fn new(query: Query<T>, paging: Option<&PagingOptions>) -> Self {
        Self {
            count_query: query.clone(),
            query: page(query, paging),
        }
    }
}

/// A paged query together with the total number of matching rows.
pub struct PagedResponse<T> {
    pub query: Query<T>,
    pub total_count: usize,
}
