//! Config sources: a TOML file and `BAILIWICK_*` environment variables.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "BAILIWICK";

/// Add a TOML config file to the builder.
/// An optional file that does not exist is skipped with a warning.
pub fn add_file(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
    required: bool,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    if !required && !path.exists() {
        warn!(
            config_path = %path.display(),
            "Configuration file not found; using defaults and environment only"
        );
        return Ok(builder);
    }

    let path_str = path.to_str().ok_or_else(|| {
        ConfigError::Message(format!("Config path is not valid UTF-8: {}", path.display()))
    })?;
    Ok(builder.add_source(
        File::new(path_str, FileFormat::Toml).required(required),
    ))
}

/// Add `BAILIWICK_*` environment overrides (`__` separates nested keys).
pub fn add_environment(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    )
}

#[derive(Deserialize)]
struct ContextsSection {
    #[serde(default)]
    contexts: HashMap<String, toml::Table>,
}

/// Read the `[contexts]` section of a TOML file verbatim.
/// The layered builder folds key case, so context names and entry keys are read here.
pub fn read_contexts(
    path: &Path,
) -> Result<HashMap<String, toml::Table>, crate::error::ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        crate::error::ConfigError::Invalid(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))
    })?;
    let section: ContextsSection = toml::from_str(&text).map_err(|e| {
        crate::error::ConfigError::Invalid(format!("Failed to parse {}: {}", path.display(), e))
    })?;
    Ok(section.contexts)
}
