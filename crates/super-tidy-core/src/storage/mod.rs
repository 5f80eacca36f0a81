//! Record Store collaborator: where labels and their references live.

pub mod memory;
pub mod models;
mod queries;
pub mod sqlite;

use crate::error::Error;
use crate::merge::PairLocks;
use crate::model::{Label, LabelId, LabelKind, ReferenceId};

pub use memory::MemoryStore;
pub use sqlite::Database;

/// Each call is individually atomic. The merge executor composes them and
/// relies on the store applying them in the order issued.
pub trait RecordStore: Send + Sync {
    /// Claim table shared by every merge executor working on this store.
    fn pair_locks(&self) -> &PairLocks;

    fn all_labels(&self, kind: &LabelKind) -> Result<Vec<Label>, Error>;

    fn label(&self, id: LabelId) -> Result<Option<Label>, Error>;

    fn references_of(&self, label: LabelId) -> Result<Vec<ReferenceId>, Error>;

    /// Move `reference` from `from` to `to`. Callers must not create a
    /// duplicate association.
    fn repoint(&self, reference: ReferenceId, from: LabelId, to: LabelId) -> Result<(), Error>;

    fn unlink(&self, reference: ReferenceId, label: LabelId) -> Result<(), Error>;

    fn set_usage_count(&self, label: LabelId, usage_count: u64) -> Result<(), Error>;

    /// Remove a label. Fails while any reference still points at it, so a
    /// merge that raced with another one can never drop references.
    fn delete(&self, label: LabelId) -> Result<(), Error>;
}
