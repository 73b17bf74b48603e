//! PostgreSQL backend.
//!
//! Provides the `PostgresConnection` struct that implements the `Connection`
//! trait for PostgreSQL databases using sqlx.

use crate::config::ConnectionParams;
use crate::db::decode::materialize_rows;
use crate::db::{BackendKind, ColumnInfo, Connection, Param, SqlQuery, Table, Value};
use crate::error::{Result, UwoError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::postgres::{PgArguments, PgConnection, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::{Column as _, Connection as _, Executor, Row as _, Statement, TypeInfo};
use std::time::Instant;
use tracing::debug;

/// A single connection to a PostgreSQL server.
#[derive(Debug)]
pub struct PostgresConnection {
    conn: PgConnection,
}

impl PostgresConnection {
    /// Connects using the given parameters.
    pub async fn connect(params: &ConnectionParams) -> Result<Self> {
        let scheme = BackendKind::Postgres.url_scheme().unwrap_or("postgres");
        let port = BackendKind::Postgres.default_port().unwrap_or(5432);
        let url = params.to_url(scheme, port)?;

        let conn = PgConnection::connect(&url)
            .await
            .map_err(|e| map_connection_error(e, params, port))?;

        debug!("Connected to PostgreSQL {}", params.display_string(port));
        Ok(Self { conn })
    }

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
impl Connection for PostgresConnection {
    fn backend(&self) -> BackendKind {
        BackendKind::Postgres
    }

    async fn fetch_all(&mut self, query: &SqlQuery) -> Result<Table> {
        let start = Instant::now();

        let rows = bind_params(sqlx::query(query.sql()), query.params())
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| UwoError::query(format_query_error(e)))?;

        let execution_time = start.elapsed();

        let columns = match rows.first() {
            Some(first) => first
                .columns()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                .collect(),
            None => self.describe_columns(query.sql()).await,
        };

        let rows = materialize_rows(&rows, &columns, |row, i| {
            convert_value(row, i, row.column(i).type_info().name())
        });

        Ok(Table::with_data(columns, rows).with_execution_time(execution_time))
    }

    async fn rollback(&mut self) -> Result<()> {
        // Outside a transaction PostgreSQL only emits a warning.
        (&mut self.conn)
            .execute("ROLLBACK")
            .await
            .map(|_| ())
            .map_err(|e| UwoError::query(format_query_error(e)))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn.close().await.map_err(|e| {
            UwoError::connection(format!("Failed to close PostgreSQL connection: {e}"))
        })
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[Param],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            Param::Text(text) => query.bind(text.clone()),
            Param::Int(int) => query.bind(*int),
        };
    }
    query
}

/// Decodes one nullable cell. `None` means a non-null value of a type the
/// driver cannot decode into `T`.
fn decode<'r, T>(row: &'r PgRow, index: usize) -> Option<Option<T>>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get::<Option<T>, _>(index).ok()
}

/// Converts a single column value from a PgRow to our Value type.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Option<Value> {
    let value = match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => Value::from(decode::<bool>(row, index)?),
        "INT2" | "SMALLINT" => Value::from(decode::<i16>(row, index)?.map(i64::from)),
        "INT4" | "INT" | "INTEGER" => Value::from(decode::<i32>(row, index)?.map(i64::from)),
        "INT8" | "BIGINT" => Value::from(decode::<i64>(row, index)?),
        "FLOAT4" | "REAL" => Value::from(decode::<f32>(row, index)?.map(f64::from)),
        "FLOAT8" | "DOUBLE PRECISION" => Value::from(decode::<f64>(row, index)?),
        "TIMESTAMP" => Value::from(decode::<NaiveDateTime>(row, index)?),
        "TIMESTAMPTZ" => {
            Value::from(decode::<DateTime<Utc>>(row, index)?.map(|v| v.naive_utc()))
        }
        "DATE" => Value::from(
            decode::<NaiveDate>(row, index)?.map(|v| v.and_time(chrono::NaiveTime::MIN)),
        ),
        "BYTEA" => Value::from(decode::<Vec<u8>>(row, index)?),
        // NUMERIC and anything else without a mapping only decode if textual
        _ => Value::from(decode::<String>(row, index)?),
    };
    Some(value)
}

/// Maps sqlx connection errors to readable messages without credentials.
fn map_connection_error(error: sqlx::Error, params: &ConnectionParams, port: u16) -> UwoError {
    let host = params.host.as_deref().unwrap_or("localhost");
    let user = params.user.as_deref().unwrap_or("unknown");
    let database = params.database.as_deref().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        UwoError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        UwoError::connection(format!(
            "Authentication failed for user '{user}'. Check PostgreSQL.User and PostgreSQL.PW."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        UwoError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        UwoError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        UwoError::connection(error.to_string())
    }
}

/// Formats a query error with PostgreSQL detail and hint if available.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }
        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
    }

    result
}
