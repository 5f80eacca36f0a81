use crate::model::LabelId;
use std::collections::HashSet;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// Single-writer discipline per label.
///
/// A merge claims both of its label ids before touching the store and holds
/// them until the returned guard drops. Merges on disjoint ids never wait on
/// each other; the table mutex is only held while claiming or releasing.
#[derive(Default)]
pub struct PairLocks {
    held: Mutex<HashSet<LabelId>>,
    released: Condvar,
}

impl PairLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn held(&self) -> MutexGuard<'_, HashSet<LabelId>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until neither id is claimed, then claim both.
    pub fn lock(&self, a: LabelId, b: LabelId) -> PairGuard<'_> {
        let mut held = self.held();
        while held.contains(&a) || held.contains(&b) {
            trace!("Waiting for labels {} and {}", a, b);
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        held.insert(a);
        held.insert(b);
        PairGuard {
            locks: self,
            ids: [a, b],
        }
    }

    pub fn is_locked(&self, id: LabelId) -> bool {
        self.held().contains(&id)
    }
}

/// Releases the claimed pair on drop.
pub struct PairGuard<'a> {
    locks: &'a PairLocks,
    ids: [LabelId; 2],
}

impl Drop for PairGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.locks.held();
        for id in &self.ids {
            held.remove(id);
        }
        drop(held);
        self.locks.released.notify_all();
    }
}
