use crate::model::{ContentFingerprint, Item, SkipReason, SkippedItem};
use crate::progress::ProgressReporter;
use crate::source::FileSource;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Cooperative cancellation, checked between items only.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Fingerprints in input order, plus the items that were skipped.
#[derive(Debug, Default)]
pub struct FingerprintBatch {
    pub entries: Vec<(Item, ContentFingerprint)>,
    pub skipped: Vec<SkippedItem>,
}

/// Fingerprint every item on `pool`. The batch always completes: unreadable
/// or cancelled items are reported in `skipped`.
pub fn fingerprint_batch(
    pool: &ThreadPool,
    items: &[Item],
    source: &dyn FileSource,
    cancel: &CancelFlag,
    reporter: &dyn ProgressReporter,
) -> FingerprintBatch {
    let (done, skipped) = run_batch(pool, items, cancel, reporter, |item| {
        super::fingerprint(item, source)
    });
    FingerprintBatch {
        entries: done
            .into_iter()
            .map(|(idx, fp)| (items[idx].clone(), fp))
            .collect(),
        skipped,
    }
}

/// Apply `job` to each item in parallel and collect `(index, result)` in
/// input order. Job failures are logged and turned into skips.
pub(crate) fn run_batch<T, F>(
    pool: &ThreadPool,
    items: &[Item],
    cancel: &CancelFlag,
    reporter: &dyn ProgressReporter,
    job: F,
) -> (Vec<(usize, T)>, Vec<SkippedItem>)
where
    T: Send,
    F: Fn(&Item) -> io::Result<T> + Sync,
{
    let total = items.len();
    let counter = AtomicUsize::new(0);
    let start = Instant::now();
    reporter.on_fingerprint_start(total);

    let results: Vec<Result<T, SkipReason>> = pool.install(|| {
        items
            .par_iter()
            .map(|item| {
                if cancel.is_cancelled() {
                    return Err(SkipReason::Cancelled);
                }
                let result = job(item).map_err(|e| {
                    warn!("Skipping unreadable item {} ({}): {}", item.id, item.path.display(), e);
                    SkipReason::Unreadable(e.to_string())
                });
                let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
                reporter.on_fingerprint_progress(n, total);
                result
            })
            .collect()
    });

    let mut done = Vec::with_capacity(total);
    let mut skipped = Vec::new();
    for (idx, result) in results.into_iter().enumerate() {
        match result {
            Ok(value) => done.push((idx, value)),
            Err(reason) => skipped.push(SkippedItem {
                item: items[idx].id,
                reason,
            }),
        }
    }

    let duration = start.elapsed().as_secs_f64();
    debug!(
        "Batch of {} items completed in {:.2}s ({} skipped)",
        total,
        duration,
        skipped.len()
    );
    reporter.on_fingerprint_complete(skipped.len(), duration);

    (done, skipped)
}
