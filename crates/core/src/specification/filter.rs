//! Typed filter predicates.
//!
//! A [`Filter<T>`] wraps an untyped [`Condition`] tree over dotted field
//! paths of `T`'s serialized form. Conditions are plain data so every store
//! can translate them and every cache key can render them.

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operator of a [`Condition::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    /// Operator symbol, shared by the rendered form and the SQL translation.
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }
}

/// Untyped predicate tree over a row's fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
    IsNull(String),
    IsNotNull(String),
    Contains {
        field: String,
        needle: String,
    },
    In {
        field: String,
        values: Vec<Value>,
    },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    /// Every field path referenced by this condition, in order of appearance.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields = Vec::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Condition::Compare { field, .. }
            | Condition::Contains { field, .. }
            | Condition::In { field, .. } => out.push(field),
            Condition::IsNull(field) | Condition::IsNotNull(field) => out.push(field),
            Condition::And(left, right) | Condition::Or(left, right) => {
                left.collect_fields(out);
                right.collect_fields(out);
            }
            Condition::Not(inner) => inner.collect_fields(out),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Compare { field, op, value } => {
                write!(f, "x.{field} {} {value}", op.symbol())
            }
            Condition::IsNull(field) => write!(f, "x.{field} IS NULL"),
            Condition::IsNotNull(field) => write!(f, "x.{field} IS NOT NULL"),
            Condition::Contains { field, needle } => {
                write!(f, "x.{field} CONTAINS {}", Value::from(needle.as_str()))
            }
            Condition::In { field, values } => {
                write!(f, "x.{field} IN {}", Value::Array(values.clone()))
            }
            Condition::And(left, right) => write!(f, "({left} AND {right})"),
            Condition::Or(left, right) => write!(f, "({left} OR {right})"),
            Condition::Not(inner) => write!(f, "NOT ({inner})"),
        }
    }
}

/// A predicate over entities of type `T`.
pub struct Filter<T> {
    condition: Condition,
    _entity: PhantomData<fn(&T)>,
}

impl<T> Filter<T> {
    pub fn from_condition(condition: Condition) -> Self {
        Self {
            condition,
            _entity: PhantomData,
        }
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn into_condition(self) -> Condition {
        self.condition
    }

    pub fn and(self, other: Filter<T>) -> Self {
        Self::from_condition(Condition::And(
            Box::new(self.condition),
            Box::new(other.condition),
        ))
    }

    pub fn or(self, other: Filter<T>) -> Self {
        Self::from_condition(Condition::Or(
            Box::new(self.condition),
            Box::new(other.condition),
        ))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::from_condition(Condition::Not(Box::new(self.condition)))
    }
}

impl<T> Clone for Filter<T> {
    fn clone(&self) -> Self {
        Self::from_condition(self.condition.clone())
    }
}

impl<T> fmt::Debug for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Filter").field(&self.condition).finish()
    }
}

impl<T> PartialEq for Filter<T> {
    fn eq(&self, other: &Self) -> bool {
        self.condition == other.condition
    }
}

impl<T> fmt::Display for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.condition.fmt(f)
    }
}

/// Starts a filter on the dotted field path `path` of `T`.
///
/// ```
/// use repokit_core::specification::{field, Filter};
///
/// struct Link;
///
/// let filter: Filter<Link> = field("category_id").gt(10).and(field("message").is_null());
/// assert_eq!(filter.to_string(), "(x.category_id > 10 AND x.message IS NULL)");
/// ```
pub fn field<T>(path: impl Into<String>) -> Field<T> {
    Field {
        path: path.into(),
        _entity: PhantomData,
    }
}

/// Field reference produced by [`field`], consumed by one of its predicates.
pub struct Field<T> {
    path: String,
    _entity: PhantomData<fn(&T)>,
}

impl<T> Field<T> {
    fn compare(self, op: CompareOp, value: impl Into<Value>) -> Filter<T> {
        Filter::from_condition(Condition::Compare {
            field: self.path,
            op,
            value: value.into(),
        })
    }

    pub fn eq(self, value: impl Into<Value>) -> Filter<T> {
        self.compare(CompareOp::Eq, value)
    }

    pub fn ne(self, value: impl Into<Value>) -> Filter<T> {
        self.compare(CompareOp::Ne, value)
    }

    pub fn gt(self, value: impl Into<Value>) -> Filter<T> {
        self.compare(CompareOp::Gt, value)
    }

    pub fn ge(self, value: impl Into<Value>) -> Filter<T> {
        self.compare(CompareOp::Ge, value)
    }

    pub fn lt(self, value: impl Into<Value>) -> Filter<T> {
        self.compare(CompareOp::Lt, value)
    }

    pub fn le(self, value: impl Into<Value>) -> Filter<T> {
        self.compare(CompareOp::Le, value)
    }

    pub fn is_null(self) -> Filter<T> {
        Filter::from_condition(Condition::IsNull(self.path))
    }

    pub fn is_not_null(self) -> Filter<T> {
        Filter::from_condition(Condition::IsNotNull(self.path))
    }

    /// Substring match on a text field. Case sensitive.
    pub fn contains(self, needle: impl Into<String>) -> Filter<T> {
        Filter::from_condition(Condition::Contains {
            field: self.path,
            needle: needle.into(),
        })
    }

    pub fn is_in<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Filter<T> {
        Filter::from_condition(Condition::In {
            field: self.path,
            values: values.into_iter().map(Into::into).collect(),
        })
    }
}
