//! Construction options for context containers.

use crate::freezer::Freezer;

/// Options fixed when a context is constructed
///
/// Derived contexts (see [`ContextDict::union`](super::ContextDict::union)) inherit both.
#[derive(Debug, Clone)]
pub struct ContextOptions {
    /// Reject reads until the context is frozen
    pub requires_frozen_for_read: bool,

    /// Freezer applied to the store on `freeze`
    pub freezer: Freezer,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            requires_frozen_for_read: true,
            freezer: Freezer::default(),
        }
    }
}

impl ContextOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read_gate(mut self, requires_frozen_for_read: bool) -> Self {
        self.requires_frozen_for_read = requires_frozen_for_read;
        self
    }

    pub fn with_freezer(mut self, freezer: Freezer) -> Self {
        self.freezer = freezer;
        self
    }
}
