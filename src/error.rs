//! Error types for the UWO tools.
//!
//! Defines the main error enum shared by the data-access layer and the
//! metadata classifier.

use thiserror::Error;

/// Main error type for UWO tool operations.
#[derive(Error, Debug)]
pub enum UwoError {
    /// Database connection errors (file missing, host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// The configured backend flag is not one of 0 (SQLite), 1 (MariaDB), 2 (PostgreSQL).
    #[error("Unsupported backend: {0} (expected 0 = sqlite, 1 = mariadb, 2 = postgres)")]
    UnsupportedBackend(i64),

    /// Query execution errors reported by the backend.
    #[error("Query error: {0}")]
    Query(String),

    /// Completion backend could not be configured (missing credentials, bad endpoint).
    #[error("Backend configuration error: {0}")]
    BackendConfiguration(String),

    /// Prompt plugin directory or function is missing.
    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    /// LLM API errors (auth, HTTP failures, malformed envelopes).
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl UwoError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a backend configuration error with the given message.
    pub fn backend_configuration(msg: impl Into<String>) -> Self {
        Self::BackendConfiguration(msg.into())
    }

    /// Creates a plugin-not-found error with the given message.
    pub fn plugin_not_found(msg: impl Into<String>) -> Self {
        Self::PluginNotFound(msg.into())
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::UnsupportedBackend(_) => "Unsupported Backend",
            Self::Query(_) => "Query Error",
            Self::BackendConfiguration(_) => "Backend Configuration Error",
            Self::PluginNotFound(_) => "Plugin Not Found",
            Self::Llm(_) => "LLM Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using UwoError.
pub type Result<T> = std::result::Result<T, UwoError>;
