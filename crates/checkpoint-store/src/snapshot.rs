//! Committed-state view for queries
//!
//! Handlers mutate a private working `MemoryStore`. At the end of each block
//! the working copy is published here, so readers only ever see state as of
//! the last committed height.

use crate::memory::MemoryStore;
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug, Default)]
struct Committed {
    height: u64,
    store: MemoryStore,
}

/// Shared handle to the last committed state
#[derive(Debug, Clone, Default)]
pub struct CommittedState {
    inner: Arc<RwLock<Committed>>,
}

impl CommittedState {
    pub fn new(height: u64, store: MemoryStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Committed { height, store })),
        }
    }

    /// Publish the working store as committed at `height`
    pub fn commit(&self, height: u64, working: &MemoryStore) {
        let mut committed = self.inner.write();
        committed.height = height;
        committed.store = working.clone();
        tracing::debug!(height, "Committed checkpoint state");
    }

    pub fn height(&self) -> u64 {
        self.inner.read().height
    }

    /// Run `f` against the committed store
    pub fn read<R>(&self, f: impl FnOnce(&MemoryStore) -> R) -> R {
        let committed = self.inner.read();
        f(&committed.store)
    }
}
