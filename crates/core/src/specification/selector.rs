use std::fmt;
use std::sync::Arc;

/// A projection from `T` to `S` with a stable textual description.
///
/// The description identifies the projection in cache keys, so two selectors
/// with the same description must compute the same result.
pub struct Selector<T, S> {
    description: String,
    select: Arc<dyn Fn(&T) -> S + Send + Sync>,
}

impl<T, S> Selector<T, S> {
    pub fn new(
        description: impl Into<String>,
        select: impl Fn(&T) -> S + Send + Sync + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            select: Arc::new(select),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn apply(&self, entity: &T) -> S {
        (self.select)(entity)
    }
}

impl<T, S> Clone for Selector<T, S> {
    fn clone(&self) -> Self {
        Self {
            description: self.description.clone(),
            select: Arc::clone(&self.select),
        }
    }
}

impl<T, S> fmt::Debug for Selector<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<T, S> fmt::Display for Selector<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}
