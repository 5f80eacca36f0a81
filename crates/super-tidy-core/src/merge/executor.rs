use crate::error::MergeError;
use crate::model::{LabelId, MergeOutcome, MergeSuggestion, ReferenceId};
use crate::storage::RecordStore;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Applies accepted merge suggestions to a record store.
///
/// The only component that mutates shared state. Each execution holds the
/// pair lock for its two labels from the re-fetch until the source is gone,
/// so two merges touching the same label never interleave. The lock table
/// belongs to the store, so any number of executors over one store share it.
pub struct MergeExecutor<S: RecordStore> {
    store: Arc<S>,
}

impl<S: RecordStore> MergeExecutor<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Merge `suggestion.source` into `suggestion.target`.
    ///
    /// Running the same suggestion twice fails the second time with
    /// [`MergeError::StaleSuggestion`]; it never corrupts state.
    pub fn execute(&self, suggestion: &MergeSuggestion) -> MergeOutcome {
        let source_id = suggestion.source.id;
        let target_id = suggestion.target.id;
        if source_id == target_id {
            return MergeOutcome::failed(MergeError::SelfMerge(source_id));
        }

        let _guard = self.store.pair_locks().lock(source_id, target_id);
        match self.merge_locked(source_id, target_id) {
            Ok(repointed) => {
                info!(
                    "Merged label {} into {}: {} references repointed",
                    source_id, target_id, repointed
                );
                MergeOutcome::succeeded(repointed)
            }
            Err(e) => {
                warn!("Merge of label {} into {} failed: {}", source_id, target_id, e);
                MergeOutcome::failed(e)
            }
        }
    }

    fn merge_locked(&self, source_id: LabelId, target_id: LabelId) -> Result<usize, MergeError> {
        // Step 1: both ends must still exist; nothing is written otherwise.
        let source = self
            .store
            .label(source_id)
            .map_err(store_error)?
            .ok_or(MergeError::StaleSuggestion(source_id))?;
        let target = self
            .store
            .label(target_id)
            .map_err(store_error)?
            .ok_or(MergeError::StaleSuggestion(target_id))?;
        if source.kind != target.kind {
            return Err(MergeError::KindMismatch(source_id, target_id));
        }

        // Step 2: move references, dropping ones the target already has.
        let already_on_target: HashSet<ReferenceId> = self
            .store
            .references_of(target_id)
            .map_err(store_error)?
            .into_iter()
            .collect();
        let mut repointed = 0usize;
        for reference in self.store.references_of(source_id).map_err(store_error)? {
            if already_on_target.contains(&reference) {
                debug!("Reference {} already on label {}, unlinking", reference.0, target_id);
                self.store.unlink(reference, source_id).map_err(store_error)?;
            } else {
                self.store
                    .repoint(reference, source_id, target_id)
                    .map_err(store_error)?;
                repointed += 1;
            }
        }

        self.store
            .set_usage_count(target_id, target.usage_count.saturating_add(source.usage_count))
            .map_err(store_error)?;

        // Step 3
        self.store.delete(source_id).map_err(store_error)?;

        Ok(repointed)
    }
}

fn store_error(e: crate::Error) -> MergeError {
    MergeError::Store(e.to_string())
}
