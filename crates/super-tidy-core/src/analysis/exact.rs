use crate::hasher::batch::{run_batch, CancelFlag};
use crate::hasher::digest::{exact_digest, partial_hash, PARTIAL_HASH_LENGTH};
use crate::model::{ContentDigest, DuplicateGroup, DuplicateKind, GroupKey, GroupReport, Item};
use crate::progress::ProgressReporter;
use crate::source::FileSource;
use ahash::AHashMap;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::collections::BTreeMap;
use tracing::debug;

/// Group items whose bytes are identical.
///
/// Three-tier strategy:
/// 1. Bucket by byte length (equal content implies equal length)
/// 2. Partial hash (first 1KB via XxHash64) inside each bucket to drop non-matches
/// 3. Full blake3 digest only on partial-hash collisions
///
/// Lengths come from `source.size`, falling back to the item's recorded size
/// when the source cannot stat it; group members carry the length used.
/// Unreadable items are reported in `skipped` and never appear in a group.
/// Groups come back sorted by descending reclaimable size (empty files last);
/// members keep their input order.
pub fn group_exact(
    pool: &ThreadPool,
    items: &[Item],
    source: &dyn FileSource,
    cancel: &CancelFlag,
    reporter: &dyn ProgressReporter,
) -> GroupReport {
    let items: Vec<Item> = pool.install(|| {
        items
            .par_iter()
            .map(|item| match source.size(item) {
                Ok(size) if size != item.size => {
                    debug!("Item {} is {} bytes, not the recorded {}", item.id, size, item.size);
                    Item { size, ..item.clone() }
                }
                _ => item.clone(),
            })
            .collect()
    });

    let mut by_size: AHashMap<u64, Vec<usize>> = AHashMap::new();
    for (idx, item) in items.iter().enumerate() {
        by_size.entry(item.size).or_default().push(idx);
    }

    let mut candidates: Vec<usize> = by_size
        .into_values()
        .filter(|bucket| bucket.len() > 1)
        .flatten()
        .collect();
    candidates.sort_unstable();
    debug!("{} of {} items share a size with another item", candidates.len(), items.len());

    // Small files are read whole by the partial tier anyway, so they go
    // straight to the full digest.
    let (small, large): (Vec<usize>, Vec<usize>) = candidates
        .into_iter()
        .partition(|&idx| items[idx].size as usize <= PARTIAL_HASH_LENGTH);

    let mut report = GroupReport::default();

    let large_items: Vec<Item> = large.iter().map(|&idx| items[idx].clone()).collect();
    let (partials, skipped) = run_batch(pool, &large_items, cancel, reporter, |item| {
        source
            .read_prefix(item, PARTIAL_HASH_LENGTH)
            .map(|data| partial_hash(&data))
    });
    report.skipped.extend(skipped);

    let mut by_partial: AHashMap<(u64, u64), Vec<usize>> = AHashMap::new();
    for (pos, hash) in partials {
        let idx = large[pos];
        by_partial.entry((items[idx].size, hash)).or_default().push(idx);
    }

    let mut needs_digest: Vec<usize> = small;
    needs_digest.extend(
        by_partial
            .into_values()
            .filter(|bucket| bucket.len() > 1)
            .flatten(),
    );
    needs_digest.sort_unstable();

    let digest_items: Vec<Item> = needs_digest.iter().map(|&idx| items[idx].clone()).collect();
    let (digests, skipped) = run_batch(pool, &digest_items, cancel, reporter, |item| {
        source.read_bytes(item).map(|data| exact_digest(&data))
    });
    report.skipped.extend(skipped);

    let mut by_digest: BTreeMap<ContentDigest, Vec<usize>> = BTreeMap::new();
    for (pos, digest) in digests {
        by_digest.entry(digest).or_default().push(needs_digest[pos]);
    }

    report.groups = by_digest
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(digest, members)| DuplicateGroup {
            key: GroupKey::Digest(digest),
            kind: DuplicateKind::Exact,
            members: members.into_iter().map(|idx| items[idx].clone()).collect(),
        })
        .collect();
    sort_by_reclaimable(&mut report.groups);
    reporter.on_grouping_complete("exact", report.groups.len());

    report
}

/// Highest-value cleanup first; ties fall back to the key for determinism.
pub fn sort_by_reclaimable(groups: &mut [DuplicateGroup]) {
    groups.sort_by(|a, b| {
        b.reclaimable_bytes()
            .cmp(&a.reclaimable_bytes())
            .then_with(|| a.key.cmp(&b.key))
    });
}
