use std::any::type_name;
use std::fmt;

use super::{Filter, Include, Navigation, OrderOption};

/// Plain option bag that converts into a [`QuerySpecification`].
pub struct QueryOptions<T> {
    pub filter_condition: Option<Filter<T>>,
    pub includes: Vec<Navigation<T>>,
    pub order_by: Vec<OrderOption<T>>,
}

impl<T> Default for QueryOptions<T> {
    fn default() -> Self {
        Self {
            filter_condition: None,
            includes: Vec::new(),
            order_by: Vec::new(),
        }
    }
}

/// Declarative description of a read over entities of type `T`.
///
/// Built by consuming `apply_*` calls. Every call only adds to the
/// specification; the one exception is [`apply_filter`](Self::apply_filter),
/// which replaces the primary filter.
///
/// The `Display` form is the canonical signature of the specification and is
/// used verbatim as a cache key:
///
/// ```
/// use repokit_core::specification::{field, OrderOption, QuerySpecification};
///
/// struct Link;
///
/// let spec = QuerySpecification::<Link>::with_filter(field("category_id").gt(10))
///     .apply_order_by([OrderOption::desc("category_id")])
///     .as_non_tracking();
///
/// assert!(spec.to_string().ends_with(
///     "_FilterCondition:x.category_id > 10\
///      _OrderOptions:OrderOption_OrderBy:x.category_id_Descending:true\
///      _IsNonTrackableQuery:true"
/// ));
/// ```
pub struct QuerySpecification<T> {
    filter_condition: Option<Filter<T>>,
    filter_conditions: Vec<Filter<T>>,
    order_options: Vec<OrderOption<T>>,
    includes: Vec<Include>,
    is_non_trackable_query: bool,
}

impl<T> QuerySpecification<T> {
    pub fn new() -> Self {
        Self {
            filter_condition: None,
            filter_conditions: Vec::new(),
            order_options: Vec::new(),
            includes: Vec::new(),
            is_non_trackable_query: false,
        }
    }

    /// Creates a specification with a primary filter.
    pub fn with_filter(filter: Filter<T>) -> Self {
        Self::new().apply_filter(filter)
    }

    /// Sets the primary filter, replacing any previous one.
    pub fn apply_filter(mut self, filter: Filter<T>) -> Self {
        self.filter_condition = Some(filter);
        self
    }

    /// Appends additional filters. All filters are combined with AND.
    pub fn apply_filters(mut self, filters: impl IntoIterator<Item = Filter<T>>) -> Self {
        self.filter_conditions.extend(filters);
        self
    }

    /// Appends typed navigation includes.
    pub fn apply_includes(mut self, navigations: impl IntoIterator<Item = Navigation<T>>) -> Self {
        self.includes
            .extend(navigations.into_iter().map(|n| Include::from(&n)));
        self
    }

    /// Appends dotted include paths such as `category.links`.
    pub fn apply_include_paths<P: Into<String>>(
        mut self,
        paths: impl IntoIterator<Item = P>,
    ) -> Self {
        self.includes
            .extend(paths.into_iter().map(|p| Include::Path(p.into())));
        self
    }

    /// Appends ordering keys. The first key ever added is the primary sort.
    pub fn apply_order_by(mut self, options: impl IntoIterator<Item = OrderOption<T>>) -> Self {
        self.order_options.extend(options);
        self
    }

    /// Marks the read as non-tracking. There is no way back.
    pub fn as_non_tracking(mut self) -> Self {
        self.is_non_trackable_query = true;
        self
    }

    pub fn filter_condition(&self) -> Option<&Filter<T>> {
        self.filter_condition.as_ref()
    }

    pub fn filter_conditions(&self) -> &[Filter<T>] {
        &self.filter_conditions
    }

    pub fn order_options(&self) -> &[OrderOption<T>] {
        &self.order_options
    }

    /// All includes, typed and dotted, in the order they were added.
    pub fn includes(&self) -> &[Include] {
        &self.includes
    }

    /// Names of the typed navigation includes.
    pub fn navigations(&self) -> impl Iterator<Item = &str> {
        self.includes
            .iter()
            .filter(|i| i.is_navigation())
            .map(Include::path)
    }

    /// Dotted include paths.
    pub fn include_paths(&self) -> impl Iterator<Item = &str> {
        self.includes
            .iter()
            .filter(|i| !i.is_navigation())
            .map(Include::path)
    }

    pub fn is_non_trackable_query(&self) -> bool {
        self.is_non_trackable_query
    }
}

impl<T> Default for QuerySpecification<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for QuerySpecification<T> {
    fn clone(&self) -> Self {
        Self {
            filter_condition: self.filter_condition.clone(),
            filter_conditions: self.filter_conditions.clone(),
            order_options: self.order_options.clone(),
            includes: self.includes.clone(),
            is_non_trackable_query: self.is_non_trackable_query,
        }
    }
}

impl<T> fmt::Debug for QuerySpecification<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySpecification")
            .field("filter_condition", &self.filter_condition)
            .field("filter_conditions", &self.filter_conditions)
            .field("order_options", &self.order_options)
            .field("includes", &self.includes)
            .field("is_non_trackable_query", &self.is_non_trackable_query)
            .finish()
    }
}

impl<T> From<QueryOptions<T>> for QuerySpecification<T> {
    fn from(options: QueryOptions<T>) -> Self {
        let spec = Self::new()
            .apply_includes(options.includes)
            .apply_order_by(options.order_by);
        match options.filter_condition {
            Some(filter) => spec.apply_filter(filter),
            None => spec,
        }
    }
}

fn join<I: fmt::Display>(items: impl IntoIterator<Item = I>) -> String {
    items
        .into_iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl<T> fmt::Display for QuerySpecification<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuerySpecification<{}>", type_name::<T>())?;
        if let Some(filter) = &self.filter_condition {
            write!(f, "_FilterCondition:{filter}")?;
        }
        if !self.filter_conditions.is_empty() {
            write!(f, "_FilterConditions:{}", join(&self.filter_conditions))?;
        }
        if !self.order_options.is_empty() {
            write!(f, "_OrderOptions:{}", join(&self.order_options))?;
        }
        let navigations: Vec<&Include> =
            self.includes.iter().filter(|i| i.is_navigation()).collect();
        if !navigations.is_empty() {
            write!(f, "_Includes:{}", join(navigations))?;
        }
        let paths: Vec<&str> = self.include_paths().collect();
        if !paths.is_empty() {
            write!(f, "_IncludeStrings:{}", paths.join(","))?;
        }
        write!(f, "_IsNonTrackableQuery:{}", self.is_non_trackable_query)
    }
}
