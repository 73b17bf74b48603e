//! MariaDB backend.
//!
//! MariaDB speaks the MySQL wire protocol, so this uses sqlx's MySQL driver.

use crate::config::ConnectionParams;
use crate::db::decode::materialize_rows;
use crate::db::{BackendKind, ColumnInfo, Connection, Param, SqlQuery, Table, Value};
use crate::error::{Result, UwoError};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::mysql::{MySql, MySqlArguments, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column as _, Connection as _, Executor, Row as _, Statement, TypeInfo};
use std::time::Instant;
use tracing::debug;

/// A single connection to a MariaDB server.
#[derive(Debug)]
pub struct MariaDbConnection {
    conn: MySqlConnection,
}

impl MariaDbConnection {
    /// Connects using the given parameters.
    pub async fn connect(params: &ConnectionParams) -> Result<Self> {
        let scheme = BackendKind::MariaDb.url_scheme().unwrap_or("mysql");
        let port = BackendKind::MariaDb.default_port().unwrap_or(3306);
        let url = params.to_url(scheme, port)?;

        let conn = MySqlConnection::connect(&url).await.map_err(|e| {
            UwoError::connection(format!(
                "Cannot connect to MariaDB {}: {e}",
                params.display_string(port)
            ))
        })?;

        debug!("Connected to MariaDB {}", params.display_string(port));
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
impl Connection for MariaDbConnection {
    fn backend(&self) -> BackendKind {
        BackendKind::MariaDb
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

        let rows = materialize_rows(&rows, &columns, |row, i| {
            convert_value(row, i, row.column(i).type_info().name())
        });

        Ok(Table::with_data(columns, rows).with_execution_time(execution_time))
    }

    async fn rollback(&mut self) -> Result<()> {
        (&mut self.conn)
            .execute("ROLLBACK")
            .await
            .map(|_| ())
            .map_err(|e| UwoError::query(e.to_string()))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn
            .close()
            .await
            .map_err(|e| UwoError::connection(format!("Failed to close MariaDB connection: {e}")))
    }
}

fn bind_params<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &[Param],
) -> Query<'q, MySql, MySqlArguments> {
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
fn decode<'r, T>(row: &'r MySqlRow, index: usize) -> Option<Option<T>>
where
    T: sqlx::Decode<'r, MySql> + sqlx::Type<MySql>,
{
    row.try_get::<Option<T>, _>(index).ok()
}

/// Converts a single column value from a MySqlRow to our Value type.
fn convert_value(row: &MySqlRow, index: usize, type_name: &str) -> Option<Value> {
    let type_name = type_name.to_uppercase();

    let value = match type_name.as_str() {
        "BOOLEAN" => Value::from(decode::<bool>(row, index)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            Value::from(decode::<i64>(row, index)?)
        }
        // Values above i64::MAX have no integer representation here
        t if t.ends_with("UNSIGNED") => {
            Value::from(decode::<u64>(row, index)?.and_then(|v| i64::try_from(v).ok()))
        }
        "FLOAT" => Value::from(decode::<f32>(row, index)?.map(f64::from)),
        "DOUBLE" => Value::from(decode::<f64>(row, index)?),
        "DATETIME" | "TIMESTAMP" => Value::from(decode::<NaiveDateTime>(row, index)?),
        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" => {
            Value::from(decode::<Vec<u8>>(row, index)?)
        }
        // DECIMAL and anything else without a mapping only decode if textual
        _ => Value::from(decode::<String>(row, index)?),
    };
    Some(value)
}
