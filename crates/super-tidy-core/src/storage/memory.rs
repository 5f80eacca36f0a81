use super::RecordStore;
use crate::error::Error;
use crate::merge::PairLocks;
use crate::model::{Label, LabelId, LabelKind, ReferenceId};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    labels: BTreeMap<LabelId, Label>,
    references: BTreeMap<LabelId, BTreeSet<ReferenceId>>,
}

/// In-process record store. Used by tests and by callers that keep their
/// records elsewhere and only need the engine for a session.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    locks: PairLocks,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_label(
        &self,
        kind: LabelKind,
        text: &str,
        usage_count: u64,
        created_at: DateTime<Utc>,
    ) -> Label {
        let mut state = self.state();
        state.next_id += 1;
        let label = Label {
            id: LabelId(state.next_id),
            kind,
            text: text.to_string(),
            usage_count,
            created_at,
        };
        state.labels.insert(label.id, label.clone());
        state.references.insert(label.id, BTreeSet::new());
        label
    }

    /// Associate `reference` with `label`. Returns false if already linked
    /// or the label does not exist.
    pub fn link(&self, reference: ReferenceId, label: LabelId) -> bool {
        self.state()
            .references
            .get_mut(&label)
            .map(|refs| refs.insert(reference))
            .unwrap_or(false)
    }

    /// Every label currently linked from `reference`.
    pub fn labels_of(&self, reference: ReferenceId) -> Vec<LabelId> {
        self.state()
            .references
            .iter()
            .filter(|(_, refs)| refs.contains(&reference))
            .map(|(id, _)| *id)
            .collect()
    }
}

impl RecordStore for MemoryStore {
    fn pair_locks(&self) -> &PairLocks {
        &self.locks
    }

    fn all_labels(&self, kind: &LabelKind) -> Result<Vec<Label>, Error> {
        Ok(self
            .state()
            .labels
            .values()
            .filter(|l| l.kind == *kind)
            .cloned()
            .collect())
    }

    fn label(&self, id: LabelId) -> Result<Option<Label>, Error> {
        Ok(self.state().labels.get(&id).cloned())
    }

    fn references_of(&self, label: LabelId) -> Result<Vec<ReferenceId>, Error> {
        Ok(self
            .state()
            .references
            .get(&label)
            .map(|refs| refs.iter().copied().collect())
            .unwrap_or_default())
    }

    fn repoint(&self, reference: ReferenceId, from: LabelId, to: LabelId) -> Result<(), Error> {
        let mut state = self.state();
        if !state.references.contains_key(&to) {
            return Err(Error::Other(format!("label {} does not exist", to)));
        }
        let removed = state
            .references
            .get_mut(&from)
            .map(|refs| refs.remove(&reference))
            .unwrap_or(false);
        if !removed {
            return Err(Error::Other(format!(
                "reference {} is not linked to label {}",
                reference.0, from
            )));
        }
        if let Some(refs) = state.references.get_mut(&to) {
            refs.insert(reference);
        }
        Ok(())
    }

    fn unlink(&self, reference: ReferenceId, label: LabelId) -> Result<(), Error> {
        if let Some(refs) = self.state().references.get_mut(&label) {
            refs.remove(&reference);
        }
        Ok(())
    }

    fn set_usage_count(&self, label: LabelId, usage_count: u64) -> Result<(), Error> {
        match self.state().labels.get_mut(&label) {
            Some(l) => {
                l.usage_count = usage_count;
                Ok(())
            }
            None => Err(Error::Other(format!("label {} does not exist", label))),
        }
    }

    fn delete(&self, label: LabelId) -> Result<(), Error> {
        let mut state = self.state();
        if state.references.get(&label).is_some_and(|refs| !refs.is_empty()) {
            return Err(Error::Other(format!("label {} still has references", label)));
        }
        state.labels.remove(&label);
        state.references.remove(&label);
        Ok(())
    }
}
