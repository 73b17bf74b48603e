//! Parameterized SQL statements.
//!
//! Caller-supplied names, dates and limits are never spliced into SQL text;
//! they travel as bound parameters behind dialect-specific placeholders.

/// SQL dialect differences between the supported backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    MariaDb,
    Postgres,
}

impl Dialect {
    /// Placeholder for the `n`-th (1-based) bound parameter.
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            Self::Sqlite | Self::MariaDb => "?".to_string(),
            Self::Postgres => format!("${n}"),
        }
    }

    /// Placeholder for a text parameter compared against a timestamp column.
    ///
    /// SQLite stores timestamps as `YYYY-MM-DD HH:MM:SS` text, so the bound is
    /// normalized with `datetime()` to make a bare date mean midnight, as it
    /// does on MariaDB and PostgreSQL.
    pub fn timestamp_placeholder(&self, n: usize) -> String {
        match self {
            Self::Sqlite => format!("datetime({})", self.placeholder(n)),
            Self::MariaDb => self.placeholder(n),
            Self::Postgres => format!("CAST(${n} AS TIMESTAMP)"),
        }
    }

    /// Name of the signal table. `SIGNAL` is a reserved word in MariaDB.
    pub fn signal_table(&self) -> &'static str {
        match self {
            Self::MariaDb => "`signal`",
            Self::Sqlite | Self::Postgres => "signal",
        }
    }
}

/// A bound query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Text(String),
    Int(i64),
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Param::Text(v.to_string())
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Param::Text(v)
    }
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Param::Int(v)
    }
}

/// SQL text plus its ordered parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlQuery {
    dialect: Dialect,
    sql: String,
    params: Vec<Param>,
}

impl SqlQuery {
    /// Starts a statement with the given SQL text.
    pub fn new(dialect: Dialect, sql: impl Into<String>) -> Self {
        Self {
            dialect,
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Appends raw SQL text.
    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Appends a placeholder and binds `param` to it.
    pub fn push_bind(&mut self, param: impl Into<Param>) -> &mut Self {
        self.params.push(param.into());
        let placeholder = self.dialect.placeholder(self.params.len());
        self.sql.push_str(&placeholder);
        self
    }

    /// Appends a timestamp-typed placeholder and binds the date text to it.
    pub fn push_bind_timestamp(&mut self, date: &str) -> &mut Self {
        self.params.push(Param::from(date));
        let placeholder = self.dialect.timestamp_placeholder(self.params.len());
        self.sql.push_str(&placeholder);
        self
    }

    /// The dialect this statement was written for.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The bound parameters, in placeholder order.
    pub fn params(&self) -> &[Param] {
        &self.params
    }
}
