//! SQLite file backend.
//!
//! Opens the UWO dataset file read-only through sqlx. SQLite is dynamically
//! typed, so values are decoded by trying integer, float, text and blob in
//! turn rather than trusting the declared column type.

use crate::db::{
    BackendKind, ColumnInfo, Connection, Param, Row, SqlQuery, Table, Value,
};
use crate::error::{Result, UwoError};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::query::Query;
use sqlx::{Column as _, ConnectOptions, Executor, Row as _, Sqlite, Statement, TypeInfo};
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// A single connection to a SQLite database file.
#[derive(Debug)]
pub struct SqliteFileConnection {
    conn: SqliteConnection,
}

impl SqliteFileConnection {
    /// Opens the database file read-only. The file must already exist.
    pub async fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(UwoError::connection(format!(
                "SQLite database file not found: {}",
                path.display()
            )));
        }

        let conn = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false)
            .connect()
            .await
            .map_err(|e| {
                UwoError::connection(format!("Cannot open {}: {e}", path.display()))
            })?;

        debug!("Opened SQLite database {}", path.display());
        Ok(Self { conn })
    }

    /// Wraps an existing connection.
    pub fn from_connection(conn: SqliteConnection) -> Self {
        Self { conn }
    }

    /// Column metadata for a statement that returned no rows.
    async fn describe_columns(&mut self, sql: &str) -> Vec<ColumnInfo> {
        match (&mut self.conn).prepare(sql).await {
            Ok(statement) => statement
                .columns()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[async_trait]
impl Connection for SqliteFileConnection {
    fn backend(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    async fn fetch_all(&mut self, query: &SqlQuery) -> Result<Table> {
        let start = Instant::now();

        let rows = bind_params(sqlx::query(query.sql()), query.params())
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| UwoError::query(e.to_string()))?;

        let execution_time = start.elapsed();

        let columns = match rows.first() {
            Some(first) => first
                .columns()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                .collect(),
            None => self.describe_columns(query.sql()).await,
        };

        let rows: Vec<Row> = rows.iter().map(convert_row).collect();

        Ok(Table::with_data(columns, rows).with_execution_time(execution_time))
    }

    async fn rollback(&mut self) -> Result<()> {
        // Fails with "no transaction is active" when nothing is pending.
        (&mut self.conn)
            .execute("ROLLBACK")
            .await
            .map(|_| ())
            .map_err(|e| UwoError::query(e.to_string()))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        sqlx::Connection::close(self.conn)
            .await
            .map_err(|e| UwoError::connection(format!("Failed to close SQLite database: {e}")))
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[Param],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            Param::Text(text) => query.bind(text.clone()),
            Param::Int(int) => query.bind(*int),
        };
    }
    query
}

/// Converts a sqlx SqliteRow to our Row type.
fn convert_row(row: &SqliteRow) -> Row {
    (0..row.columns().len())
        .map(|i| convert_value(row, i))
        .collect()
}

/// Decodes one cell by its storage class.
fn convert_value(row: &SqliteRow, index: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return Value::from(v);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return Value::from(v);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return Value::from(v);
    }
    row.try_get::<Option<Vec<u8>>, _>(index)
        .ok()
        .flatten()
        .map(Value::Bytes)
        .unwrap_or(Value::Null)
}
