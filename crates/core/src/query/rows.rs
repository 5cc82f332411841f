//! In-memory evaluation of query plans over JSON rows.
//!
//! Comparison follows SQLite's rules for values read with `json_extract`:
//! NULL sorts first, numbers (booleans count as 0/1) before text, text
//! compares bytewise, and any comparison involving NULL is false.

use std::cmp::Ordering;

use serde_json::Value;

use crate::specification::{CompareOp, Condition};

use super::{QueryPlan, SortKey};

/// Resolves a dotted field path inside a row.
pub fn field_value<'a>(row: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(row, |value, segment| value.get(segment))
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) | Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Array(_) | Value::Object(_) => 3,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Total order over optional JSON values. Missing values sort as NULL.
pub fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    let left = left.unwrap_or(&Value::Null);
    let right = right.unwrap_or(&Value::Null);
    match rank(left).cmp(&rank(right)) {
        Ordering::Equal => {}
        other => return other,
    }
    match (left, right) {
        (Value::String(a), Value::String(b)) => a.as_bytes().cmp(b.as_bytes()),
        (Value::Null, Value::Null) => Ordering::Equal,
        _ => match (as_number(left), as_number(right)) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => left.to_string().cmp(&right.to_string()),
        },
    }
}

fn is_null(value: Option<&Value>) -> bool {
    value.is_none_or(Value::is_null)
}

fn compare_matches(actual: Option<&Value>, op: CompareOp, expected: &Value) -> bool {
    if is_null(actual) || expected.is_null() {
        return false;
    }
    let ordering = compare_values(actual, Some(expected));
    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
    }
}

/// Evaluates a condition against a row.
pub fn matches(condition: &Condition, row: &Value) -> bool {
    match condition {
        Condition::Compare { field, op, value } => {
            compare_matches(field_value(row, field), *op, value)
        }
        Condition::IsNull(field) => is_null(field_value(row, field)),
        Condition::IsNotNull(field) => !is_null(field_value(row, field)),
        Condition::Contains { field, needle } => match field_value(row, field) {
            Some(Value::String(text)) => text.contains(needle.as_str()),
            Some(Value::Number(n)) => n.to_string().contains(needle.as_str()),
            Some(Value::Bool(flag)) => {
                let text = if *flag { "1" } else { "0" };
                text.contains(needle.as_str())
            }
            _ => false,
        },
        Condition::In { field, values } => {
            let actual = field_value(row, field);
            values
                .iter()
                .any(|value| compare_matches(actual, CompareOp::Eq, value))
        }
        Condition::And(left, right) => matches(left, row) && matches(right, row),
        Condition::Or(left, right) => matches(left, row) || matches(right, row),
        Condition::Not(inner) => !matches(inner, row),
    }
}

/// Compares two rows by a list of sort keys, first key primary.
pub fn compare_rows(left: &Value, right: &Value, ordering: &[SortKey]) -> Ordering {
    ordering
        .iter()
        .map(|key| {
            let ordering = compare_values(
                field_value(left, &key.field),
                field_value(right, &key.field),
            );
            if key.descending {
                ordering.reverse()
            } else {
                ordering
            }
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Filters, orders and windows rows according to a plan.
///
/// The sort is stable, so rows that tie on every key keep their input order.
pub fn apply_plan(rows: impl IntoIterator<Item = Value>, plan: &QueryPlan) -> Vec<Value> {
    let mut rows: Vec<Value> = rows
        .into_iter()
        .filter(|row| plan.conditions.iter().all(|c| matches(c, row)))
        .collect();
    if !plan.ordering.is_empty() {
        rows.sort_by(|a, b| compare_rows(a, b, &plan.ordering));
    }
    let window = rows.into_iter().skip(plan.skip);
    match plan.take {
        Some(take) => window.take(take).collect(),
        None => window.collect(),
    }
}

/// Counts the rows matching a plan's conditions.
pub fn count_plan<'a>(rows: impl IntoIterator<Item = &'a Value>, plan: &QueryPlan) -> usize {
    rows.into_iter()
        .filter(|row| plan.conditions.iter().all(|c| matches(c, row)))
        .count()
}
