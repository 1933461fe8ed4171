//! Slot table: the only state the pool's slots share.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OwnedSemaphorePermit;
use tracing::debug;

/// Counters collected over the lifetime of a pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of slots ever created; equals the number of dispatched tasks.
    pub slots_created: usize,
    /// Highest number of slots live at the same time.
    pub peak_active: usize,
}

#[derive(Debug, Default)]
struct SlotState {
    next_id: u64,
    // slot id -> task index
    live: BTreeMap<u64, usize>,
    stats: PoolStats,
}

#[derive(Debug, Default)]
pub(super) struct SlotTable {
    state: Mutex<SlotState>,
}

impl SlotTable {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn create(&self, task: usize) -> u64 {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.live.insert(id, task);
        state.stats.slots_created += 1;
        state.stats.peak_active = state.stats.peak_active.max(state.live.len());
        debug!(slot = id, task, live = state.live.len(), "slot created");
        id
    }

    fn retire(&self, id: u64) {
        let mut state = self.lock();
        if let Some(task) = state.live.remove(&id) {
            debug!(slot = id, task, live = state.live.len(), "slot retired");
        }
    }

    pub(super) fn stats(&self) -> PoolStats {
        self.lock().stats
    }
}

/// A live slot. Dropping it retires the slot, then frees its capacity.
pub(super) struct SlotLease {
    table: Arc<SlotTable>,
    id: u64,
    _permit: OwnedSemaphorePermit,
}

impl SlotLease {
    pub(super) fn open(table: &Arc<SlotTable>, task: usize, permit: OwnedSemaphorePermit) -> Self {
        let id = table.create(task);
        Self {
            table: Arc::clone(table),
            id,
            _permit: permit,
        }
    }
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        self.table.retire(self.id);
    }
}
