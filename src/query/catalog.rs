//! The fixed set of UWO catalog queries.
//!
//! The `*_query` functions only build SQL; [`SensorCatalog`] runs them and
//! normalizes the returned columns. Names are the lookup keys of the
//! dataset and are always bound as parameters.

use tracing::info;

use super::executor::QueryExecutor;
use super::normalize;
use crate::config::DatabaseConfig;
use crate::db::{Dialect, SqlQuery, Table};
use crate::error::Result;

/// Variable name selected by [`SensorCatalog::get_flow_rate_time_series`].
pub const FLOW_RATE_VARIABLE: &str = "flow_rate";

/// Optional bounds for time series and metadata queries.
///
/// Dates are inclusive on both ends and compared as the backend compares
/// its timestamp column. Unset fields add no clause.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeRangeFilter {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<i64>,
}

impl TimeRangeFilter {
    /// A filter with no bounds.
    pub fn new() -> Self {
        Self::default()
    }

    /// A filter bounded on both ends.
    pub fn between(start_date: impl Into<String>, end_date: impl Into<String>) -> Self {
        Self {
            start_date: Some(start_date.into()),
            end_date: Some(end_date.into()),
            limit: None,
        }
    }

    /// Sets the inclusive lower bound.
    pub fn start(mut self, date: impl Into<String>) -> Self {
        self.start_date = Some(date.into());
        self
    }

    /// Sets the inclusive upper bound.
    pub fn end(mut self, date: impl Into<String>) -> Self {
        self.end_date = Some(date.into());
        self
    }

    /// Caps the number of rows.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    fn push_bounds(&self, query: &mut SqlQuery, column: &str) {
        if let Some(start) = &self.start_date {
            query.push("\nAND ").push(column).push(" >= ");
            query.push_bind_timestamp(start);
        }
        if let Some(end) = &self.end_date {
            query.push("\nAND ").push(column).push(" <= ");
            query.push_bind_timestamp(end);
        }
    }

    fn push_limit(&self, query: &mut SqlQuery) {
        if let Some(limit) = self.limit {
            query.push("\nLIMIT ").push_bind(limit);
        }
    }
}

/// All variables with unit and description.
pub fn list_variables_query(dialect: Dialect) -> SqlQuery {
    SqlQuery::new(
        dialect,
        "SELECT name, unit, description\nFROM variable",
    )
}

/// Distinct sites that recorded signals of the named variable.
pub fn list_sites_for_variable_query(dialect: Dialect, variable: &str) -> SqlQuery {
    let mut query = SqlQuery::new(
        dialect,
        format!(
            "SELECT s.name AS name, sig.site_id AS site_id\n\
             FROM site s\n\
             JOIN (\n    \
                 SELECT DISTINCT sg.site_id\n    \
                 FROM {signal} sg\n    \
                 JOIN variable v ON sg.variable_id = v.variable_id\n    \
                 WHERE v.name = ",
            signal = dialect.signal_table()
        ),
    );
    query.push_bind(variable).push("\n) AS sig ON s.site_id = sig.site_id");
    query
}

/// Distinct sources that recorded any signal at the named site.
pub fn list_sensors_for_site_query(dialect: Dialect, site: &str) -> SqlQuery {
    let mut query = SqlQuery::new(
        dialect,
        format!(
            "SELECT src.source_id AS source_id, src.name AS name, src.description AS description\n\
             FROM source src\n\
             WHERE src.source_id IN (\n    \
                 SELECT DISTINCT sg.source_id\n    \
                 FROM {signal} sg\n    \
                 JOIN site st ON sg.site_id = st.site_id\n    \
                 WHERE st.name = ",
            signal = dialect.signal_table()
        ),
    );
    query.push_bind(site).push("\n)");
    query
}

/// Timestamp and value of every signal of the named source.
pub fn get_time_series_query(dialect: Dialect, source: &str, filter: &TimeRangeFilter) -> SqlQuery {
    let mut query = SqlQuery::new(
        dialect,
        format!(
            "SELECT sg.timestamp AS timestamp, sg.value AS value\n\
             FROM {signal} sg\n\
             WHERE sg.source_id IN (SELECT source_id FROM source WHERE name = ",
            signal = dialect.signal_table()
        ),
    );
    query.push_bind(source).push(")");
    filter.push_bounds(&mut query, "sg.timestamp");
    query.push("\nORDER BY sg.timestamp");
    filter.push_limit(&mut query);
    query
}

/// Metadata history entries of the named source, filtered on `timestamp_start`.
pub fn get_meta_data_query(dialect: Dialect, source: &str, filter: &TimeRangeFilter) -> SqlQuery {
    let mut query = SqlQuery::new(
        dialect,
        "SELECT mdh.timestamp_start AS timestamp_start,\n       \
         mdh.timestamp_end AS timestamp_end,\n       \
         mdh.comment AS comment,\n       \
         mdh.additional_meta_info AS additional_meta_info\n\
         FROM meta_data_history mdh\n\
         WHERE mdh.meta_data_id IN (\n    \
             SELECT md.meta_data_id\n    \
             FROM meta_data md\n    \
             JOIN source src ON md.source_id = src.source_id\n    \
             WHERE src.name = ",
    );
    query.push_bind(source).push("\n)");
    filter.push_bounds(&mut query, "mdh.timestamp_start");
    query.push("\nORDER BY mdh.timestamp_start");
    filter.push_limit(&mut query);
    query
}

/// Every `flow_rate` signal joined with source, site and variable names.
pub fn get_flow_rate_time_series_query(dialect: Dialect) -> SqlQuery {
    let mut query = SqlQuery::new(
        dialect,
        format!(
            "SELECT sg.signal_id AS signal_id,\n       \
             sg.timestamp AS timestamp,\n       \
             sg.value AS value,\n       \
             src.name AS source_name,\n       \
             st.name AS site_name,\n       \
             var.name AS variable_name\n\
             FROM {signal} sg\n\
             JOIN source src ON sg.source_id = src.source_id\n\
             JOIN site st ON sg.site_id = st.site_id\n\
             JOIN variable var ON sg.variable_id = var.variable_id\n\
             WHERE var.name = ",
            signal = dialect.signal_table()
        ),
    );
    query.push_bind(FLOW_RATE_VARIABLE).push("\nORDER BY sg.timestamp");
    query
}

/// Read-only access to the UWO dataset.
#[derive(Debug, Clone)]
pub struct SensorCatalog {
    executor: QueryExecutor,
}

impl SensorCatalog {
    /// Creates a catalog on top of an executor.
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    /// Creates a catalog that opens real connections.
    pub fn from_config(config: DatabaseConfig) -> Self {
        Self::new(QueryExecutor::new(config))
    }

    /// The underlying executor.
    pub fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    /// Lists all variables: `name, unit, description`.
    pub async fn list_variables(&self) -> Result<Table> {
        let query = list_variables_query(self.executor.dialect()?);
        self.executor.run_query(&query).await
    }

    /// Lists sites that recorded `variable`: `name, site_id`.
    pub async fn list_sites_for_variable(&self, variable: &str) -> Result<Table> {
        let query = list_sites_for_variable_query(self.executor.dialect()?, variable);
        self.executor.run_query(&query).await
    }

    /// Lists sensors at `site`: `source_id, name, description`.
    pub async fn list_sensors_for_site(&self, site: &str) -> Result<Table> {
        let query = list_sensors_for_site_query(self.executor.dialect()?, site);
        self.executor.run_query(&query).await
    }

    /// Time series of `source`: `timestamp, value`, ascending by timestamp.
    ///
    /// Timestamps that cannot be parsed come back as nulls.
    pub async fn get_time_series(&self, source: &str, filter: &TimeRangeFilter) -> Result<Table> {
        let query = get_time_series_query(self.executor.dialect()?, source, filter);
        let mut table = self.executor.run_query(&query).await?;

        normalize::normalize_timestamp_column(&mut table, "timestamp");
        Ok(table)
    }

    /// Metadata of `source`: `timestamp_start, timestamp_end, comment,
    /// additional_meta_info, sensor_name`, ascending by `timestamp_start`.
    pub async fn get_meta_data(&self, source: &str, filter: &TimeRangeFilter) -> Result<Table> {
        let query = get_meta_data_query(self.executor.dialect()?, source, filter);
        let mut table = self.executor.run_query(&query).await?;

        normalize::normalize_timestamp_column(&mut table, "timestamp_start");
        normalize::normalize_timestamp_column(&mut table, "timestamp_end");
        normalize::coerce_text_column(&mut table, "comment");
        normalize::tag_sensor_name(&mut table, source);
        Ok(table)
    }

    /// Every flow rate signal across all sources and sites.
    ///
    /// Takes no filters; timestamps are returned as the backend delivers them.
    pub async fn get_flow_rate_time_series(&self) -> Result<Table> {
        info!("Fetching all {FLOW_RATE_VARIABLE} signals");
        let query = get_flow_rate_time_series_query(self.executor.dialect()?);
        self.executor.run_query(&query).await
    }
}
