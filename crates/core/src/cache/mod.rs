mod error;
mod keys;
mod serialization;
mod traits;

pub use error::{CacheError, Result};
pub use keys::{paging_extension, raw_sql_key, specification_key, RAW_SQL_KEY_PREFIX};
pub use serialization::{
    deserialize_present, deserialize_value, serialize_value, SerializationError,
};
pub use traits::Cache;
