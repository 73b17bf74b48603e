//! Integration tests for the UWO tools.
//!
//! The SQLite fixture lives in `common`; network backends are optional.

pub mod catalog_test;
pub mod cli_test;
pub mod common;
pub mod network_test;
