//! Error types for context containers, the freezer, and the context registry.

use thiserror::Error;

/// Errors raised by context operations
///
/// Every variant is a programmer-facing failure of a single call. None of them are
/// retryable and none leave partial state behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("Context already exists: {0}")]
    DuplicateContext(String),

    #[error("Context not found: {0}")]
    ContextNotFound(String),

    #[error("Context must be frozen before {0}")]
    NotFrozen(&'static str),

    #[error("Cannot {0} a frozen context")]
    ImmutableState(&'static str),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Freeze rule '{rule}' rejected value: {reason}")]
    FreezeRejected { rule: String, reason: String },
}

/// Errors raised while loading configuration or installing the log subscriber
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Invalid(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Log setup failed: {0}")]
    Logging(String),

    #[error("Context error: {0}")]
    Context(#[from] ContextError),
}
