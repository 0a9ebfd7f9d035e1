//! Context registry: named storage of context containers.
//!
//! A registry hands out shared [`ContextDict`] handles by name. Names are create-once:
//! there is no stable way to replace or delete an entry. Lookups and creates resolve
//! against the calling thread's current scope (see [`ContextRegistry::scope`]); threads
//! that never enter a scope all share the registry's root scope.

mod scope;

pub use scope::{ScopeGuard, ScopeSnapshot};

use crate::config::BailiwickConfig;
use crate::context::{ContextDict, ContextOptions};
use crate::error::ContextError;
use crate::value::{Mapping, Value};
use scope::Scope;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Registry of named contexts with per-thread scoped views
pub struct ContextRegistry {
    id: u64,
    root: Arc<Scope>,
}

impl Default for ContextRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        ContextRegistry {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            root: Arc::new(Scope::default()),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    fn current(&self) -> Arc<Scope> {
        scope::current(self.id).unwrap_or_else(|| Arc::clone(&self.root))
    }

    /// Create a Mutable context and register it under `name` in the current scope
    pub fn create(
        &self,
        name: impl Into<String>,
        entries: impl Into<Mapping>,
        options: ContextOptions,
    ) -> Result<Arc<ContextDict>, ContextError> {
        let name = name.into();
        let entries = entries.into();
        let scope = self.current();
        let ctx = scope.insert_new(name.clone(), || ContextDict::with_options(entries, options))?;
        debug!(context = %name, depth = self.scope_depth(), "Context created");
        Ok(ctx)
    }

    /// Look up the context registered under `name` in the current scope
    pub fn get(&self, name: &str) -> Result<Arc<ContextDict>, ContextError> {
        self.current()
            .lookup(name)
            .ok_or_else(|| ContextError::ContextNotFound(name.to_string()))
    }

    /// Names visible in the current scope, sorted
    pub fn names(&self) -> Vec<String> {
        self.current().names()
    }

    /// Enter a nested scope on this thread
    ///
    /// The scope starts with every name visible right now. Contexts created while the
    /// guard lives are only visible inside it and vanish when it is dropped.
    pub fn scope(&self) -> ScopeGuard<'_> {
        ScopeGuard::enter(self, Scope::with_contexts(self.current().snapshot()))
    }

    /// Capture the current view for use on another thread
    pub fn snapshot(&self) -> ScopeSnapshot {
        ScopeSnapshot {
            contexts: self.current().snapshot(),
        }
    }

    /// Enter a scope that starts from `snapshot` instead of the current view
    pub fn enter(&self, snapshot: &ScopeSnapshot) -> ScopeGuard<'_> {
        ScopeGuard::enter(self, Scope::with_contexts(snapshot.contexts.clone()))
    }

    /// Number of scopes this thread has entered on this registry (0 at the root)
    pub fn scope_depth(&self) -> usize {
        scope::depth(self.id)
    }

    /// Create and freeze one context per `[contexts.<name>]` table of `config`
    ///
    /// Contexts use the options from `config.defaults` and are frozen before they become
    /// visible. Seeding is all-or-nothing: if any name is already taken in the current
    /// scope, nothing is registered. Returned contexts are in name order.
    pub fn seed_from_config(
        &self,
        config: &BailiwickConfig,
    ) -> Result<Vec<Arc<ContextDict>>, ContextError> {
        let mut tables: Vec<_> = config.contexts.iter().collect();
        tables.sort_by(|a, b| a.0.cmp(b.0));

        let mut batch = Vec::with_capacity(tables.len());
        for (name, table) in tables {
            let entries: Mapping = table
                .iter()
                .map(|(key, value)| (key.clone(), Value::from(value.clone())))
                .collect();
            let ctx = ContextDict::with_options(entries, config.options());
            ctx.freeze()?;
            batch.push((name.clone(), ctx));
        }

        let seeded = self.current().insert_all(batch)?;
        debug!(contexts = seeded.len(), depth = self.scope_depth(), "Contexts seeded");
        Ok(seeded)
    }

    /// Remove a name from the current scope
    ///
    /// Test teardown only; not part of the stable API.
    #[doc(hidden)]
    pub fn discard(&self, name: &str) -> Option<Arc<ContextDict>> {
        self.current().remove(name)
    }
}

impl std::fmt::Debug for ContextRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextRegistry")
            .field("id", &self.id)
            .field("root", &self.root.names())
            .finish()
    }
}
