//! Registry scopes and the per-thread scope stack.
//!
//! Each thread keeps, per registry, a stack of scopes it has entered. The top of the stack
//! is the thread's current view; an empty stack means the registry's root scope. Entering
//! a scope pushes a copy of the current view, so names added inside never leak out and
//! names added outside after entry are not seen inside.

use crate::context::ContextDict;
use crate::error::ContextError;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

use super::ContextRegistry;

thread_local! {
    static SCOPE_STACKS: RefCell<HashMap<u64, Vec<Arc<Scope>>>> = RefCell::new(HashMap::new());
}

/// One view of the registry: name -> context
#[derive(Default)]
pub(crate) struct Scope {
    contexts: Mutex<HashMap<String, Arc<ContextDict>>>,
}

impl Scope {
    pub(crate) fn with_contexts(contexts: HashMap<String, Arc<ContextDict>>) -> Self {
        Scope {
            contexts: Mutex::new(contexts),
        }
    }

    /// Insert a context built by `make` unless `name` is taken
    ///
    /// The existence check and the insert happen under one lock, so of several racing
    /// callers exactly one succeeds.
    pub(crate) fn insert_new(
        &self,
        name: String,
        make: impl FnOnce() -> ContextDict,
    ) -> Result<Arc<ContextDict>, ContextError> {
        let mut contexts = self.contexts.lock();
        if contexts.contains_key(&name) {
            return Err(ContextError::DuplicateContext(name));
        }
        let ctx = Arc::new(make());
        contexts.insert(name, Arc::clone(&ctx));
        Ok(ctx)
    }

    /// Insert every context of `batch` or none of them
    ///
    /// All names are checked before anything is inserted, under the same lock.
    pub(crate) fn insert_all(
        &self,
        batch: Vec<(String, ContextDict)>,
    ) -> Result<Vec<Arc<ContextDict>>, ContextError> {
        let mut contexts = self.contexts.lock();
        if let Some((name, _)) = batch.iter().find(|(name, _)| contexts.contains_key(name)) {
            return Err(ContextError::DuplicateContext(name.clone()));
        }
        Ok(batch
            .into_iter()
            .map(|(name, ctx)| {
                let ctx = Arc::new(ctx);
                contexts.insert(name, Arc::clone(&ctx));
                ctx
            })
            .collect())
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<Arc<ContextDict>> {
        self.contexts.lock().get(name).cloned()
    }

    pub(crate) fn remove(&self, name: &str) -> Option<Arc<ContextDict>> {
        self.contexts.lock().remove(name)
    }

    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.contexts.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub(crate) fn snapshot(&self) -> HashMap<String, Arc<ContextDict>> {
        self.contexts.lock().clone()
    }
}

/// Current scope of this thread for the given registry
pub(crate) fn current(registry_id: u64) -> Option<Arc<Scope>> {
    SCOPE_STACKS.with(|stacks| {
        stacks
            .borrow()
            .get(&registry_id)
            .and_then(|stack| stack.last().cloned())
    })
}

/// Number of scopes this thread has entered on the given registry
pub(crate) fn depth(registry_id: u64) -> usize {
    SCOPE_STACKS.with(|stacks| stacks.borrow().get(&registry_id).map_or(0, Vec::len))
}

fn push(registry_id: u64, scope: Arc<Scope>) -> usize {
    SCOPE_STACKS.with(|stacks| {
        let mut stacks = stacks.borrow_mut();
        let stack = stacks.entry(registry_id).or_default();
        stack.push(scope);
        stack.len()
    })
}

// Also drops any scope above `scope` whose guard was leaked.
fn pop(registry_id: u64, scope: &Arc<Scope>) {
    let _ = SCOPE_STACKS.try_with(|stacks| {
        let mut stacks = stacks.borrow_mut();
        if let Some(stack) = stacks.get_mut(&registry_id) {
            if let Some(position) = stack.iter().rposition(|s| Arc::ptr_eq(s, scope)) {
                stack.truncate(position);
            }
            if stack.is_empty() {
                stacks.remove(&registry_id);
            }
        }
    });
}

/// RAII handle for an entered scope
///
/// Dropping the guard leaves the scope on every exit path, including unwinding. The guard
/// is tied to the thread that entered the scope and cannot be sent elsewhere.
#[must_use = "the scope is left as soon as the guard is dropped"]
pub struct ScopeGuard<'a> {
    registry_id: u64,
    scope: Arc<Scope>,
    depth: usize,
    _marker: PhantomData<(&'a ContextRegistry, *const ())>,
}

impl<'a> ScopeGuard<'a> {
    pub(crate) fn enter(registry: &'a ContextRegistry, scope: Scope) -> Self {
        let scope = Arc::new(scope);
        let depth = push(registry.id(), Arc::clone(&scope));
        debug!(depth, "Entered context scope");
        ScopeGuard {
            registry_id: registry.id(),
            scope,
            depth,
            _marker: PhantomData,
        }
    }

    /// Nesting depth of this scope (1 for the first scope above the root)
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        pop(self.registry_id, &self.scope);
        debug!(depth = self.depth, "Left context scope");
    }
}

/// Copy of a registry view that can be carried to another thread
///
/// Pass it to [`ContextRegistry::enter`] on the receiving thread to open a scope that
/// starts with the same names.
#[derive(Clone, Default)]
pub struct ScopeSnapshot {
    pub(crate) contexts: HashMap<String, Arc<ContextDict>>,
}

impl ScopeSnapshot {
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.contexts.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

impl std::fmt::Debug for ScopeSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeSnapshot")
            .field("names", &self.names())
            .finish()
    }
}
