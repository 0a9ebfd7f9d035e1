//! Configuration System
//!
//! Layered configuration for library defaults, logging, and seed contexts. Sources are
//! merged lowest precedence first: built-in defaults, an optional TOML file, then
//! `BAILIWICK_*` environment variables (`__` separates nested keys, e.g.
//! `BAILIWICK_DEFAULTS__REQUIRES_FROZEN_FOR_READ=false`).
//!
//! Seed contexts are the exception: `[contexts.<name>]` tables are read from the file as
//! written, so context names and entry keys keep their case.

use crate::context::ContextOptions;
use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

mod merge_policy;
mod sources;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BailiwickConfig {
    /// Defaults applied to contexts created from this configuration
    #[serde(default)]
    pub defaults: ContextDefaults,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Seed contexts: one table per context name
    #[serde(default)]
    pub contexts: HashMap<String, toml::Table>,
}

/// Context construction defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextDefaults {
    /// Reject reads until a context is frozen
    #[serde(default = "default_true")]
    pub requires_frozen_for_read: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ContextDefaults {
    fn default() -> Self {
        Self {
            requires_frozen_for_read: default_true(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Context(String, String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Context(name, msg) => write!(f, "Context '{}': {}", name, msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl BailiwickConfig {
    /// Construction options derived from `defaults`
    pub fn options(&self) -> ContextOptions {
        ContextOptions::new().with_read_gate(self.defaults.requires_frozen_for_read)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for name in self.contexts.keys() {
            if name.trim().is_empty() {
                errors.push(ValidationError::Context(
                    name.clone(),
                    "Context name cannot be empty".to_string(),
                ));
            }
        }

        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Loads [`BailiwickConfig`] from layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load defaults, then `path` if given and present, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<BailiwickConfig, ConfigError> {
        let mut builder = merge_policy::builder_with_defaults()?;
        let mut contexts_file = None;
        if let Some(path) = path {
            builder = sources::add_file(builder, path, false)?;
            contexts_file = Some(path).filter(|p| p.exists());
        }
        builder = sources::add_environment(builder);
        Self::finish(builder, contexts_file)
    }

    /// Load defaults and a required file; the environment is ignored
    pub fn load_from_file(path: &Path) -> Result<BailiwickConfig, ConfigError> {
        let builder = sources::add_file(merge_policy::builder_with_defaults()?, path, true)?;
        Self::finish(builder, Some(path))
    }

    /// Built-in defaults only
    pub fn default() -> BailiwickConfig {
        BailiwickConfig::default()
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        contexts_file: Option<&Path>,
    ) -> Result<BailiwickConfig, ConfigError> {
        let mut config: BailiwickConfig = builder.build()?.try_deserialize()?;
        if let Some(path) = contexts_file {
            config.contexts = sources::read_contexts(path)?;
        }

        config.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ConfigError::Invalid(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;

        debug!(contexts = config.contexts.len(), "Configuration loaded");
        Ok(config)
    }
}
