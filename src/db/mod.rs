//! Database abstraction layer.
//!
//! Provides a trait-based interface over the three interchangeable UWO
//! backends (SQLite file, MariaDB, PostgreSQL). Every query runs on its own
//! connection, acquired and released through [`with_connection`].

mod decode;
mod mariadb;
mod mock;
mod postgres;
mod scope;
mod sqlite;
mod statement;
mod types;

pub use mariadb::MariaDbConnection;
pub use mock::{MockConnection, MockOpener, MockStats};
pub use postgres::PostgresConnection;
pub use scope::with_connection;
pub use sqlite::SqliteFileConnection;
pub use statement::{Dialect, Param, SqlQuery};
pub use types::{ColumnInfo, Row, Table, Value};

use crate::config::DatabaseConfig;
use crate::error::{Result, UwoError};
use async_trait::async_trait;
use std::fmt;

/// Supported database backends, selected by an integer flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Embedded SQLite file (flag 0).
    Sqlite,
    /// MariaDB over the MySQL protocol (flag 1).
    MariaDb,
    /// PostgreSQL (flag 2).
    Postgres,
}

impl BackendKind {
    /// Parses the configuration flag.
    pub fn from_flag(flag: i64) -> Result<Self> {
        match flag {
            0 => Ok(Self::Sqlite),
            1 => Ok(Self::MariaDb),
            2 => Ok(Self::Postgres),
            other => Err(UwoError::UnsupportedBackend(other)),
        }
    }

    /// Returns the configuration flag for this backend.
    pub fn flag(&self) -> i64 {
        match self {
            Self::Sqlite => 0,
            Self::MariaDb => 1,
            Self::Postgres => 2,
        }
    }

    /// Returns the backend as a string for log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::MariaDb => "mariadb",
            Self::Postgres => "postgres",
        }
    }

    /// Returns the default port for network backends.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::Sqlite => None,
            Self::MariaDb => Some(3306),
            Self::Postgres => Some(5432),
        }
    }

    /// Returns the URL scheme for network backends.
    pub fn url_scheme(&self) -> Option<&'static str> {
        match self {
            Self::Sqlite => None,
            Self::MariaDb => Some("mysql"),
            Self::Postgres => Some("postgres"),
        }
    }

    /// Returns the SQL dialect spoken by this backend.
    pub fn dialect(&self) -> Dialect {
        match self {
            Self::Sqlite => Dialect::Sqlite,
            Self::MariaDb => Dialect::MariaDb,
            Self::Postgres => Dialect::Postgres,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single open database connection.
///
/// Connections are owned by exactly one call and are never pooled.
#[async_trait]
pub trait Connection: Send {
    /// The backend this connection talks to.
    fn backend(&self) -> BackendKind;

    /// Executes a statement and materializes every row.
    async fn fetch_all(&mut self, query: &SqlQuery) -> Result<Table>;

    /// Reverts any pending transaction.
    async fn rollback(&mut self) -> Result<()>;

    /// Closes the connection.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Opens connections for a backend kind.
#[async_trait]
pub trait ConnectionOpener: Send + Sync {
    /// Opens a fresh connection to the given backend.
    async fn open(&self, kind: BackendKind) -> Result<Box<dyn Connection>>;
}

/// Opens real connections using a [`DatabaseConfig`].
#[derive(Debug, Clone)]
pub struct BackendOpener {
    config: DatabaseConfig,
}

impl BackendOpener {
    /// Creates an opener for the given configuration.
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ConnectionOpener for BackendOpener {
    async fn open(&self, kind: BackendKind) -> Result<Box<dyn Connection>> {
        match kind {
            BackendKind::Sqlite => {
                let conn = SqliteFileConnection::open(&self.config.sqlite_path).await?;
                Ok(Box::new(conn))
            }
            BackendKind::MariaDb => {
                let conn = MariaDbConnection::connect(&self.config.mariadb_params()).await?;
                Ok(Box::new(conn))
            }
            BackendKind::Postgres => {
                let conn = PostgresConnection::connect(&self.config.postgres_params()).await?;
                Ok(Box::new(conn))
            }
        }
    }
}
