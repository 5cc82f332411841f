use std::fmt;
use std::marker::PhantomData;

use crate::specification::{Filter, OrderOption};
use crate::storage::Entity;

use super::{QueryPlan, SortKey};

/// A typed, composable read over entities of type `T`.
///
/// Filters are ANDed, ordering applies to the whole filtered set, and
/// `skip`/`take` compose the way LINQ operators do: `take` after `skip`
/// narrows the window and `skip` after `take` shrinks it.
pub struct Query<T> {
    plan: QueryPlan,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Query<T> {
    /// Tracking query over every row of `T::TABLE`.
    pub fn new() -> Self {
        Self::from_plan(QueryPlan::new(T::TABLE))
    }
}

impl<T: Entity> Default for Query<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Query<T> {
    pub fn from_plan(plan: QueryPlan) -> Self {
        Self {
            plan,
            _entity: PhantomData,
        }
    }

    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }

    pub fn into_plan(self) -> QueryPlan {
        self.plan
    }

    pub fn is_tracking(&self) -> bool {
        self.plan.tracking
    }

    pub fn as_no_tracking(mut self) -> Self {
        self.plan.tracking = false;
        self
    }

    pub fn filter(mut self, filter: &Filter<T>) -> Self {
        self.plan.conditions.push(filter.condition().clone());
        self
    }

    pub fn include_path(mut self, path: impl Into<String>) -> Self {
        self.plan.includes.push(path.into());
        self
    }

    /// Orders by `option`, replacing any previous ordering.
    pub fn order_by(mut self, option: &OrderOption<T>) -> OrderedQuery<T> {
        self.plan.ordering = vec![sort_key(option)];
        OrderedQuery { query: self }
    }

    pub fn skip(mut self, count: usize) -> Self {
        self.plan.skip = self.plan.skip.saturating_add(count);
        self.plan.take = self.plan.take.map(|take| take.saturating_sub(count));
        self
    }

    pub fn take(mut self, count: usize) -> Self {
        self.plan.take = Some(self.plan.take.map_or(count, |take| take.min(count)));
        self
    }
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self::from_plan(self.plan.clone())
    }
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Query").field(&self.plan).finish()
    }
}

/// A query with a primary ordering that accepts tie-breakers.
pub struct OrderedQuery<T> {
    query: Query<T>,
}

impl<T> OrderedQuery<T> {
    /// Adds a tie-breaker ordering key.
    pub fn then_by(mut self, option: &OrderOption<T>) -> Self {
        self.query.plan.ordering.push(sort_key(option));
        self
    }

    pub fn into_query(self) -> Query<T> {
        self.query
    }
}

impl<T> From<OrderedQuery<T>> for Query<T> {
    fn from(ordered: OrderedQuery<T>) -> Self {
        ordered.query
    }
}

fn sort_key<T>(option: &OrderOption<T>) -> SortKey {
    SortKey {
        field: option.key().to_string(),
        descending: option.is_descending(),
    }
}
