use crate::hasher::simhash::hamming_distance;
use crate::model::{DuplicateGroup, DuplicateKind, GroupKey, Item};
use tracing::debug;

/// Single-linkage, one-pass clustering of SimHash fingerprints.
///
/// Each unprocessed item seeds a cluster and absorbs every later unprocessed
/// item within `max_distance` bits of the seed. Not globally optimal, but
/// deterministic for a fixed input order. O(n²) in the number of items.
pub fn cluster_near(hashed: &[(Item, u64)], max_distance: u32) -> Vec<DuplicateGroup> {
    let mut processed = vec![false; hashed.len()];
    let mut groups = Vec::new();

    for i in 0..hashed.len() {
        if processed[i] {
            continue;
        }
        processed[i] = true;
        let (seed, seed_hash) = &hashed[i];
        let mut members = vec![seed.clone()];

        for j in (i + 1)..hashed.len() {
            if processed[j] {
                continue;
            }
            let (candidate, candidate_hash) = &hashed[j];
            if hamming_distance(*seed_hash, *candidate_hash) <= max_distance {
                processed[j] = true;
                members.push(candidate.clone());
            }
        }

        if members.len() > 1 {
            groups.push(DuplicateGroup {
                key: GroupKey::SimHash(*seed_hash),
                kind: DuplicateKind::Near,
                members,
            });
        }
    }

    debug!(
        "Clustered {} hashed items into {} near-duplicate groups (max distance {})",
        hashed.len(),
        groups.len(),
        max_distance
    );
    groups
}
