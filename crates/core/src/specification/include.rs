use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

/// Typed reference to a single navigation property of `T`.
pub struct Navigation<T> {
    name: String,
    _entity: PhantomData<fn(&T)>,
}

impl<T> Navigation<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            _entity: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Clone for Navigation<T> {
    fn clone(&self) -> Self {
        Self::new(self.name.clone())
    }
}

impl<T> fmt::Debug for Navigation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Navigation").field(&self.name).finish()
    }
}

/// A related-data inclusion recorded on a specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Include {
    /// A typed navigation property, one level deep.
    Navigation(String),
    /// A dotted navigation path such as `category.links`.
    Path(String),
}

impl Include {
    pub fn path(&self) -> &str {
        match self {
            Include::Navigation(name) | Include::Path(name) => name,
        }
    }

    pub fn is_navigation(&self) -> bool {
        matches!(self, Include::Navigation(_))
    }
}

impl<T> From<&Navigation<T>> for Include {
    fn from(navigation: &Navigation<T>) -> Self {
        Include::Navigation(navigation.name.clone())
    }
}

impl fmt::Display for Include {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Include::Navigation(name) => write!(f, "x.{name}"),
            Include::Path(path) => f.write_str(path),
        }
    }
}
