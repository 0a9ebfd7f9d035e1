//! Bailiwick: Freezable Context Containers
//!
//! Key/value containers with a one-way Mutable -> Frozen lifecycle, a pluggable freezer
//! that converts nested values into immutable equivalents, and a registry of named
//! contexts with per-thread scopes.

pub mod config;
pub mod context;
pub mod error;
pub mod freezer;
pub mod hasher;
pub mod logging;
pub mod registry;
pub mod types;
pub mod value;

pub use config::{BailiwickConfig, ConfigLoader};
pub use context::{ContextDict, ContextOptions};
pub use error::{ConfigError, ContextError};
pub use freezer::{rule, FreezeRule, Freezer, FreezerBuilder, RuleOutcome};
pub use registry::{ContextRegistry, ScopeGuard, ScopeSnapshot};
pub use types::{Fingerprint, Key};
pub use value::{FrozenSet, Mapping, Object, Value};
