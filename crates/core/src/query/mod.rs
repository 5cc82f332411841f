mod builder;
mod evaluator;
mod paginate;
mod plan;
mod rows;

pub use builder::{OrderedQuery, Query};
pub use evaluator::apply_specification;
pub use paginate::{page, PagedQuery, PagedResponse};
pub use plan::{validate_field_path, validate_identifier, QueryPlan, SortKey};
pub use rows::{apply_plan, compare_rows, compare_values, count_plan, field_value, matches};
