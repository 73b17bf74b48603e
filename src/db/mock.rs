//! Mock connections for testing.
//!
//! Returns a canned table (or a canned error) and counts how often
//! connections are opened, rolled back and closed.

use super::{BackendKind, Connection, ConnectionOpener, SqlQuery, Table};
use crate::error::{Result, UwoError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Shared counters observed by tests.
#[derive(Debug, Clone, Default)]
pub struct MockStats {
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    rolled_back: Arc<AtomicUsize>,
    queries: Arc<Mutex<Vec<SqlQuery>>>,
}

impl MockStats {
    /// Number of connections opened.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Number of connections closed.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of rollbacks issued.
    pub fn rolled_back(&self) -> usize {
        self.rolled_back.load(Ordering::SeqCst)
    }

    /// Every statement executed, in order.
    pub fn queries(&self) -> Vec<SqlQuery> {
        self.queries
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }
}

/// Opens [`MockConnection`]s.
#[derive(Debug, Clone)]
pub struct MockOpener {
    table: Table,
    query_error: Option<String>,
    open_error: Option<String>,
    stats: MockStats,
}

impl MockOpener {
    /// Every query returns a copy of `table`.
    pub fn new(table: Table) -> Self {
        Self {
            table,
            query_error: None,
            open_error: None,
            stats: MockStats::default(),
        }
    }

    /// Every query fails with a query error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            query_error: Some(message.into()),
            ..Self::new(Table::new())
        }
    }

    /// Opening a connection fails with a connection error carrying `message`.
    pub fn refuse_connections(mut self, message: impl Into<String>) -> Self {
        self.open_error = Some(message.into());
        self
    }

    /// Counters shared with every connection this opener creates.
    pub fn stats(&self) -> MockStats {
        self.stats.clone()
    }
}

#[async_trait]
impl ConnectionOpener for MockOpener {
    async fn open(&self, kind: BackendKind) -> Result<Box<dyn Connection>> {
        if let Some(message) = &self.open_error {
            return Err(UwoError::connection(message.clone()));
        }

        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConnection {
            kind,
            table: self.table.clone(),
            query_error: self.query_error.clone(),
            stats: self.stats.clone(),
        }))
    }
}

/// A connection that never touches a database.
#[derive(Debug)]
pub struct MockConnection {
    kind: BackendKind,
    table: Table,
    query_error: Option<String>,
    stats: MockStats,
}

#[async_trait]
impl Connection for MockConnection {
    fn backend(&self) -> BackendKind {
        self.kind
    }

    async fn fetch_all(&mut self, query: &SqlQuery) -> Result<Table> {
        if let Ok(mut queries) = self.stats.queries.lock() {
            queries.push(query.clone());
        }

        match &self.query_error {
            Some(message) => Err(UwoError::query(message.clone())),
            None => Ok(self.table.clone()),
        }
    }

    async fn rollback(&mut self) -> Result<()> {
        self.stats.rolled_back.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
