use std::fmt;

use serde::{Deserialize, Serialize};

/// Page size used when no paging options are supplied.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Zero-based page window over a result set.
///
/// A negative `page_index` is treated as the first page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PagingOptions {
    pub page_index: i64,
    pub page_size: usize,
}

impl PagingOptions {
    pub fn new(page_index: i64, page_size: usize) -> Self {
        Self {
            page_index,
            page_size,
        }
    }

    /// Number of rows to skip before the page starts.
    pub fn skip(&self) -> usize {
        let index = usize::try_from(self.page_index.max(0)).unwrap_or(usize::MAX);
        index.saturating_mul(self.page_size)
    }
}

impl Default for PagingOptions {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

impl From<(i64, usize)> for PagingOptions {
    fn from((page_index, page_size): (i64, usize)) -> Self {
        Self::new(page_index, page_size)
    }
}

impl fmt::Display for PagingOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PagingOptions_Index:{}_Size:{}",
            self.page_index, self.page_size
        )
    }
}

/// One page of results plus the size of the whole filtered set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagedData<T> {
    pub data: Vec<T>,
    pub total_items: usize,
}

impl<T> PagedData<T> {
    /// Creates a page. Missing data becomes an empty page.
    pub fn new(data: Option<Vec<T>>, total_items: usize) -> Self {
        Self {
            data: data.unwrap_or_default(),
            total_items,
        }
    }

    /// Maps every item of the page, keeping the total.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedData<U> {
        PagedData {
            data: self.data.into_iter().map(f).collect(),
            total_items: self.total_items,
        }
    }
}

impl<T> Default for PagedData<T> {
    fn default() -> Self {
        Self::new(None, 0)
    }
}
