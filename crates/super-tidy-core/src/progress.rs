/// Trait for reporting engine progress.
///
/// The CLI implements it with indicatif bars. All methods default to no-ops.
pub trait ProgressReporter: Send + Sync {
    fn on_walk_start(&self) {}
    fn on_walk_complete(&self, _total_files: usize, _duration_secs: f64) {}
    fn on_fingerprint_start(&self, _total_items: usize) {}
    fn on_fingerprint_progress(&self, _items_done: usize, _total_items: usize) {}
    fn on_fingerprint_complete(&self, _skipped: usize, _duration_secs: f64) {}
    fn on_grouping_complete(&self, _kind: &str, _groups: usize) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
