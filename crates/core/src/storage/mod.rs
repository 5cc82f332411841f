mod error;
mod traits;
mod types;

pub use error::{RepositoryError, Result};
pub use traits::{CommandRepository, Projection, QueryRepository, Selection, Store};
pub use types::{
    Cardinality, Change, ChangeKind, DataTable, Entity, EntityEntry, EntityState, Relation,
    SqlParameter,
};
