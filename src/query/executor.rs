//! Query execution against the configured backend.
//!
//! Every call resolves the backend flag, opens one connection through the
//! scoped acquisition in [`crate::db::with_connection`], materializes the
//! rows and closes the connection again.

use std::sync::Arc;

use tracing::debug;

use crate::config::DatabaseConfig;
use crate::db::{
    with_connection, BackendKind, BackendOpener, ConnectionOpener, Dialect, SqlQuery, Table,
};
use crate::error::Result;

/// Runs statements on fresh connections to the configured backend.
#[derive(Clone)]
pub struct QueryExecutor {
    config: DatabaseConfig,
    opener: Arc<dyn ConnectionOpener>,
}

impl std::fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("backend", &self.config.backend)
            .finish_non_exhaustive()
    }
}

impl QueryExecutor {
    /// Creates an executor that opens real connections.
    pub fn new(config: DatabaseConfig) -> Self {
        let opener = Arc::new(BackendOpener::new(config.clone()));
        Self { config, opener }
    }

    /// Creates an executor with a custom connection opener.
    pub fn with_opener(config: DatabaseConfig, opener: Arc<dyn ConnectionOpener>) -> Self {
        Self { config, opener }
    }

    /// The configured backend. Fails for an unknown flag.
    pub fn backend(&self) -> Result<BackendKind> {
        self.config.backend_kind()
    }

    /// The SQL dialect of the configured backend.
    pub fn dialect(&self) -> Result<Dialect> {
        Ok(self.backend()?.dialect())
    }

    /// Executes a statement and returns every row.
    ///
    /// An unknown backend flag fails before any connection is attempted.
    /// Backend errors are returned unchanged.
    pub async fn run_query(&self, query: &SqlQuery) -> Result<Table> {
        let kind = self.backend()?;
        debug!(backend = %kind, params = query.params().len(), "Running query");

        let query = query.clone();
        let table = with_connection(self.opener.as_ref(), kind, |conn| {
            Box::pin(async move { conn.fetch_all(&query).await })
        })
        .await?;

        debug!(
            backend = %kind,
            rows = table.len(),
            elapsed_ms = table.execution_time.as_millis() as u64,
            "Query finished"
        );
        Ok(table)
    }

    /// Executes literal SQL text without parameters.
    pub async fn run_sql(&self, sql: &str) -> Result<Table> {
        let query = SqlQuery::new(self.dialect()?, sql);
        self.run_query(&query).await
    }
}
