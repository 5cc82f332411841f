use crate::specification::QuerySpecification;

use super::Query;

/// Applies a specification to a query.
///
/// Order of application: non-tracking flag, primary filter, additional
/// filters, typed includes, dotted include paths, then ordering. The first
/// order option replaces any ordering already on `query`; the rest become
/// tie-breakers. `None` returns `query` unchanged.
pub fn apply_specification<T>(query: Query<T>, spec: Option<&QuerySpecification<T>>) -> Query<T> {
    let Some(spec) = spec else {
        return query;
    };

    let mut query = query;
    if spec.is_non_trackable_query() {
        query = query.as_no_tracking();
    }
    if let Some(filter) = spec.filter_condition() {
        query = query.filter(filter);
    }
    for filter in spec.filter_conditions() {
        query = query.filter(filter);
    }
    for navigation in spec.navigations() {
        query = query.include_path(navigation);
    }
    for path in spec.include_paths() {
        query = query.include_path(path);
    }

    let mut options = spec.order_options().iter();
    if let Some(first) = options.next() {
        query = options
            .fold(query.order_by(first), |ordered, option| ordered.then_by(option))
            .into_query();
    }
    query
}
