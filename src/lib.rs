//! UWO tools - data access and metadata classification for the UWO sewer
//! sensor dataset.
//!
//! This library exposes the core modules for the `uwo` binary and the
//! integration tests.

pub mod classifier;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod query;
