//! SQL statements for the JSON document tables.
//!
//! Every table has the shape `(key TEXT PRIMARY KEY, body TEXT)` where `body`
//! holds the entity as JSON. Field paths are read with `json_extract`.
//! Table names and field paths must be validated before they reach these
//! builders; literal values are always bound as parameters.

use rusqlite::types::Value as SqlValue;

use repokit_core::query::QueryPlan;
use repokit_core::specification::Condition;

use super::conversions::{json_to_sql, usize_to_sql};

pub fn create_table(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS \"{table}\" (\
         key TEXT PRIMARY KEY NOT NULL, \
         body TEXT NOT NULL)"
    )
}

pub fn insert_row(table: &str) -> String {
    format!("INSERT INTO \"{table}\" (key, body) VALUES (?1, ?2)")
}

pub fn update_row(table: &str) -> String {
    format!("UPDATE \"{table}\" SET body = ?2 WHERE key = ?1")
}

pub fn delete_row(table: &str) -> String {
    format!("DELETE FROM \"{table}\" WHERE key = ?1")
}

fn json_path(field: &str) -> String {
    format!("json_extract(body, '$.{field}')")
}

/// Translates a condition. Leaves are coalesced to 0/1 so `NOT` never sees NULL.
fn condition_sql(condition: &Condition, params: &mut Vec<SqlValue>) -> String {
    match condition {
        Condition::Compare { value, .. } if value.is_null() => "0".to_string(),
        Condition::Compare { field, op, value } => {
            params.push(json_to_sql(value));
            format!("COALESCE({} {} ?, 0)", json_path(field), op.symbol())
        }
        Condition::IsNull(field) => format!("{} IS NULL", json_path(field)),
        Condition::IsNotNull(field) => format!("{} IS NOT NULL", json_path(field)),
        Condition::Contains { field, needle } => {
            params.push(SqlValue::Text(needle.clone()));
            format!("COALESCE(instr({}, ?) > 0, 0)", json_path(field))
        }
        Condition::In { values, .. } if values.is_empty() => "0".to_string(),
        Condition::In { field, values } => {
            params.extend(values.iter().map(json_to_sql));
            let placeholders = vec!["?"; values.len()].join(", ");
            format!("COALESCE({} IN ({placeholders}), 0)", json_path(field))
        }
        Condition::And(left, right) => {
            let left = condition_sql(left, params);
            let right = condition_sql(right, params);
            format!("({left} AND {right})")
        }
        Condition::Or(left, right) => {
            let left = condition_sql(left, params);
            let right = condition_sql(right, params);
            format!("({left} OR {right})")
        }
        Condition::Not(inner) => format!("NOT ({})", condition_sql(inner, params)),
    }
}

fn where_clause(plan: &QueryPlan, params: &mut Vec<SqlValue>) -> String {
    if plan.conditions.is_empty() {
        return String::new();
    }
    let predicates: Vec<String> = plan
        .conditions
        .iter()
        .map(|c| condition_sql(c, params))
        .collect();
    format!(" WHERE {}", predicates.join(" AND "))
}

/// Builds the row query for a plan. Rows tie-break on insertion order.
pub fn select_rows(plan: &QueryPlan) -> (String, Vec<SqlValue>) {
    let mut params = Vec::new();
    let mut sql = format!("SELECT body FROM \"{}\"", plan.table);
    sql.push_str(&where_clause(plan, &mut params));

    let mut order: Vec<String> = plan
        .ordering
        .iter()
        .map(|key| {
            let direction = if key.descending { "DESC" } else { "ASC" };
            format!("{} {direction}", json_path(&key.field))
        })
        .collect();
    order.push("rowid ASC".to_string());
    sql.push_str(&format!(" ORDER BY {}", order.join(", ")));

    match plan.take {
        Some(take) => {
            sql.push_str(" LIMIT ? OFFSET ?");
            params.push(usize_to_sql(take));
            params.push(usize_to_sql(plan.skip));
        }
        None if plan.skip > 0 => {
            sql.push_str(" LIMIT -1 OFFSET ?");
            params.push(usize_to_sql(plan.skip));
        }
        None => {}
    }
    (sql, params)
}

/// Builds the count query for a plan. Ordering and window are ignored.
pub fn count_rows(plan: &QueryPlan) -> (String, Vec<SqlValue>) {
    let mut params = Vec::new();
    let mut sql = format!("SELECT COUNT(*) FROM \"{}\"", plan.table);
    sql.push_str(&where_clause(plan, &mut params));
    (sql, params)
}
