use std::fmt;
use std::marker::PhantomData;

/// One ordering key of a specification: a dotted field path of `T` and a
/// direction.
pub struct OrderOption<T> {
    key: String,
    descending: bool,
    _entity: PhantomData<fn(&T)>,
}

impl<T> OrderOption<T> {
    pub fn new(key: impl Into<String>, descending: bool) -> Self {
        Self {
            key: key.into(),
            descending,
            _entity: PhantomData,
        }
    }

    pub fn asc(key: impl Into<String>) -> Self {
        Self::new(key, false)
    }

    pub fn desc(key: impl Into<String>) -> Self {
        Self::new(key, true)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_descending(&self) -> bool {
        self.descending
    }
}

impl<T> Clone for OrderOption<T> {
    fn clone(&self) -> Self {
        Self::new(self.key.clone(), self.descending)
    }
}

impl<T> fmt::Debug for OrderOption<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderOption")
            .field("key", &self.key)
            .field("descending", &self.descending)
            .finish()
    }
}

impl<T> PartialEq for OrderOption<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.descending == other.descending
    }
}

impl<T> fmt::Display for OrderOption<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OrderOption_OrderBy:x.{}_Descending:{}",
            self.key, self.descending
        )
    }
}
