use std::any::type_name;

use crate::specification::{PagingOptions, QuerySpecification};
use crate::storage::SqlParameter;

/// Prefix of every raw SQL cache key.
pub const RAW_SQL_KEY_PREFIX: &str = "CachedQueryRepository<DataTable>_SqlQuery:";

/// Returns the cache key for a specification-driven read returning `R`.
///
/// Uses the specification's canonical signature tagged with the result type,
/// or `QuerySpecification<{R}>` when there is none, followed by `extension`.
/// Entity and projection reads of one specification never share a key.
pub fn specification_key<T, R: ?Sized>(
    spec: Option<&QuerySpecification<T>>,
    extension: Option<&str>,
) -> String {
    let base = match spec {
        Some(spec) => format!("{spec}_Result:{}", type_name::<R>()),
        None => format!("QuerySpecification<{}>", type_name::<R>()),
    };
    match extension {
        Some(extension) => format!("{base}{extension}"),
        None => base,
    }
}

/// Renders paging options for use as a key extension. `None` renders the defaults.
pub fn paging_extension(paging: Option<&PagingOptions>) -> String {
    paging.copied().unwrap_or_default().to_string()
}

/// Returns the cache key for a raw SQL query and its parameters.
pub fn raw_sql_key(sql: &str, parameters: &[SqlParameter]) -> String {
    let parameters = parameters
        .iter()
        .map(|p| format!("{}:{}", p.name, p.value))
        .collect::<Vec<_>>()
        .join(",");
    format!("{RAW_SQL_KEY_PREFIX}{sql}_Parameters:{parameters}")
}
