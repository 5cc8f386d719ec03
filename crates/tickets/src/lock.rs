//! Per-ticket mutual exclusion.
//!
//! Every read-modify-write of a ticket in the manager happens while holding
//! that ticket's lock. Locks live in a shared table keyed by ticket id and
//! are removed as soon as nobody holds or waits for them, so the table only
//! grows with the number of tickets being touched concurrently.
//!
//! Callers that need more than one lock take them parent first, child
//! second. Validation, issuance and the cascading delete all walk the
//! ticket graph in that direction, so lock acquisition never cycles.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockTable = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Table of per-ticket async locks. Clones share the table.
#[derive(Debug, Default, Clone)]
pub(crate) struct TicketLocks {
    table: LockTable,
}

impl TicketLocks {
    /// Waits for exclusive access to `id`.
    pub(crate) async fn lock(&self, id: &str) -> TicketLockGuard {
        let entry = {
            let mut table = self.table.lock();
            Arc::clone(table.entry(id.to_owned()).or_default())
        };
        let guard = entry.lock_owned().await;
        TicketLockGuard { table: Arc::clone(&self.table), id: id.to_owned(), guard: Some(guard) }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table.lock().len()
    }
}

/// Exclusive access to one ticket id; released on drop.
#[derive(Debug)]
pub(crate) struct TicketLockGuard {
    table: LockTable,
    id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TicketLockGuard {
    fn drop(&mut self) {
        let mut table = self.table.lock();
        let Some(guard) = self.guard.take() else {
            return;
        };
        let entry = Arc::clone(OwnedMutexGuard::mutex(&guard));
        drop(guard);
        // Only the table and `entry` remain when nobody else holds or waits.
        if Arc::strong_count(&entry) <= 2 {
            table.remove(&self.id);
        }
    }
}
