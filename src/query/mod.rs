//! Query construction, execution and result normalization for the UWO dataset.
//!
//! This module separates the fixed catalog queries from the connection
//! handling in [`crate::db`].

pub mod catalog;
pub mod executor;
pub mod normalize;

pub use catalog::{SensorCatalog, TimeRangeFilter, FLOW_RATE_VARIABLE};
pub use executor::QueryExecutor;
