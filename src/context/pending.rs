//! The pending-matrix registry
//!
//! A matrix with queued element updates is registered here until those
//! updates are materialized into its compressed storage. Insertion and
//! removal are O(1); [`super::Context::wait`] walks the whole set once,
//! materializing every live entry, and leaves it empty. The registry
//! holds weak references only, so dropping a pending matrix simply
//! retires its entry.

use crate::error::Result;
use std::collections::HashMap;
use std::sync::Weak;

/// Flush hook implemented by every matrix core, type-erased so one
/// registry serves matrices of all element types
pub(crate) trait PendingFlush: Send + Sync {
    /// Materialize queued updates; unregisters on success
    fn flush_pending(&self) -> Result<()>;
}

#[derive(Default)]
pub(crate) struct PendingSet {
    entries: HashMap<u64, Weak<dyn PendingFlush>>,
}

impl PendingSet {
    pub fn insert(&mut self, id: u64, entry: Weak<dyn PendingFlush>) {
        self.entries.insert(id, entry);
    }

    pub fn remove(&mut self, id: u64) {
        self.entries.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Snapshot the current members (taken without holding the lock
    /// during materialization, to keep lock order core-then-registry)
    pub fn snapshot(&self) -> Vec<(u64, Weak<dyn PendingFlush>)> {
        self.entries.iter().map(|(k, v)| (*k, v.clone())).collect()
    }
}
