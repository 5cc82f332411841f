mod filter;
mod include;
mod order;
mod paging;
mod query_specification;
mod selector;

pub use filter::{field, CompareOp, Condition, Field, Filter};
pub use include::{Include, Navigation};
pub use order::OrderOption;
pub use paging::{PagedData, PagingOptions, DEFAULT_PAGE_SIZE};
pub use query_specification::{QueryOptions, QuerySpecification};
pub use selector::Selector;
