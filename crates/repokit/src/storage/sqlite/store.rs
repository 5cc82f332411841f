//! SQLite store implementation.
//!
//! Implements `repokit_core::storage::Store` on top of JSON document tables.

use async_trait::async_trait;
use rusqlite::types::{ToSql, Value as SqlValue};
use rusqlite::{params, params_from_iter};
use serde_json::Value;
use tokio_rusqlite::Connection;

use repokit_core::query::{validate_identifier, QueryPlan};
use repokit_core::storage::{
    Change, ChangeKind, DataTable, RepositoryError, Result, SqlParameter, Store,
};

use super::conversions::{json_to_sql, parameter_name, sql_to_json};
use super::error::{map_rusqlite_error_with_key, map_tokio_rusqlite_error, raise};
use super::schema;

/// Helper to wrap rusqlite errors for tokio_rusqlite closures.
fn wrap_err(e: rusqlite::Error) -> tokio_rusqlite::Error {
    tokio_rusqlite::Error::Rusqlite(e)
}

/// A change with its body already encoded, ready to move into a connection closure.
struct EncodedChange {
    table: String,
    key: String,
    kind: EncodedKind,
}

enum EncodedKind {
    Insert(String),
    Update(String),
    Delete,
}

fn encode(change: &Change) -> Result<EncodedChange> {
    validate_identifier(&change.table)?;
    let kind = match &change.kind {
        ChangeKind::Insert(body) => EncodedKind::Insert(serde_json::to_string(body)?),
        ChangeKind::Update(body) => EncodedKind::Update(serde_json::to_string(body)?),
        ChangeKind::Delete => EncodedKind::Delete,
    };
    Ok(EncodedChange {
        table: change.table.clone(),
        key: change.key.clone(),
        kind,
    })
}

/// SQLite-based store implementation.
///
/// Provides async access to SQLite storage through a single background
/// connection.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Creates a new store with a file-based database.
    ///
    /// The database file will be created if it doesn't exist. Tables are
    /// created on first use.
    pub async fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Ok(Self { conn })
    }

    /// Creates a new store with an in-memory database.
    ///
    /// Useful for testing - data is lost when the connection is dropped.
    pub async fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        Ok(Self { conn })
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn ensure_table(&self, table: &str) -> Result<()> {
        validate_identifier(table)?;
        let sql = schema::create_table(table);

        self.conn
            .call(move |conn| {
                conn.execute_batch(&sql).map_err(wrap_err)?;
                Ok(())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, table))
    }

    async fn fetch(&self, plan: &QueryPlan) -> Result<Vec<Value>> {
        plan.validate()?;
        let (sql, params) = schema::select_rows(plan);

        let bodies = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql).map_err(wrap_err)?;
                let rows = stmt
                    .query_map(params_from_iter(params.iter()), |row| row.get::<_, String>(0))
                    .map_err(wrap_err)?;

                let mut bodies = Vec::new();
                for row_result in rows {
                    bodies.push(row_result.map_err(wrap_err)?);
                }
                Ok(bodies)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, &plan.table))?;

        tracing::debug!(table = %plan.table, rows = bodies.len(), "Fetched rows");

        bodies
            .iter()
            .map(|body| serde_json::from_str(body).map_err(RepositoryError::from))
            .collect()
    }

    async fn count(&self, plan: &QueryPlan) -> Result<usize> {
        plan.validate()?;
        let (sql, params) = schema::count_rows(plan);

        let count = self
            .conn
            .call(move |conn| {
                conn.query_row(&sql, params_from_iter(params.iter()), |row| {
                    row.get::<_, i64>(0)
                })
                .map_err(wrap_err)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, &plan.table))?;

        usize::try_from(count).map_err(|e| RepositoryError::InvalidData(e.to_string()))
    }

    async fn commit(&self, changes: &[Change]) -> Result<usize> {
        let encoded = changes.iter().map(encode).collect::<Result<Vec<_>>>()?;

        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let mut affected = 0;

                for change in &encoded {
                    let table = change.table.as_str();
                    let key = change.key.as_str();
                    let result = match &change.kind {
                        EncodedKind::Insert(body) => {
                            tx.execute(&schema::insert_row(table), params![key, body])
                        }
                        EncodedKind::Update(body) => {
                            tx.execute(&schema::update_row(table), params![key, body])
                        }
                        EncodedKind::Delete => tx.execute(&schema::delete_row(table), params![key]),
                    };
                    let rows = result
                        .map_err(|e| raise(map_rusqlite_error_with_key(&e, table, key)))?;
                    if rows == 0 {
                        // Dropping the transaction rolls back everything staged so far
                        return Err(raise(RepositoryError::Concurrency {
                            table: table.to_string(),
                            key: key.to_string(),
                        }));
                    }
                    affected += rows;
                }

                tx.commit().map_err(wrap_err)?;
                Ok(affected)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "transaction"))
    }

    async fn execute_raw(&self, sql: &str, parameters: &[SqlParameter]) -> Result<DataTable> {
        let sql = sql.to_string();
        let bound: Vec<(String, SqlValue)> = parameters
            .iter()
            .map(|p| (parameter_name(&p.name), json_to_sql(&p.value)))
            .collect();

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql).map_err(wrap_err)?;
                let columns: Vec<String> =
                    stmt.column_names().into_iter().map(String::from).collect();
                let named: Vec<(&str, &dyn ToSql)> = bound
                    .iter()
                    .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
                    .collect();

                let mut rows = stmt.query(named.as_slice()).map_err(wrap_err)?;
                let mut table = DataTable {
                    columns,
                    rows: Vec::new(),
                };
                while let Some(row) = rows.next().map_err(wrap_err)? {
                    let mut cells = Vec::with_capacity(table.columns.len());
                    for index in 0..table.columns.len() {
                        cells.push(sql_to_json(row.get_ref(index).map_err(wrap_err)?));
                    }
                    table.rows.push(cells);
                }
                Ok(table)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "raw"))
    }
}
