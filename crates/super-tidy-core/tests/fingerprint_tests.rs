use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};

use super_tidy_core::hasher::{self, exact_digest, hamming_distance, near_hash, CancelFlag};
use super_tidy_core::model::{Item, ItemId, SkipReason};
use super_tidy_core::{EngineConfig, FileSource, SilentReporter, SimilarityEngine};

/// In-memory file source; items without data behave like unreadable files.
struct MapSource {
    data: HashMap<ItemId, Vec<u8>>,
    full_reads: AtomicUsize,
}

impl MapSource {
    fn new(entries: &[(i64, &[u8])]) -> Self {
        Self {
            data: entries.iter().map(|(id, d)| (ItemId(*id), d.to_vec())).collect(),
            full_reads: AtomicUsize::new(0),
        }
    }
}

impl FileSource for MapSource {
    fn read_bytes(&self, item: &Item) -> io::Result<Vec<u8>> {
        self.full_reads.fetch_add(1, Ordering::SeqCst);
        self.data
            .get(&item.id)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "gone"))
    }

    fn size(&self, item: &Item) -> io::Result<u64> {
        self.data
            .get(&item.id)
            .map(|d| d.len() as u64)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "gone"))
    }
}

fn engine() -> SimilarityEngine {
    SimilarityEngine::new(EngineConfig {
        worker_threads: 2,
        ..EngineConfig::default()
    })
    .unwrap()
}

#[test]
fn test_exact_digest_determinism_and_distinctness() {
    let a = b"quarterly report v1".to_vec();
    let b = b"quarterly report v2".to_vec();
    assert_eq!(exact_digest(&a), exact_digest(&a.clone()));
    assert_ne!(exact_digest(&a), exact_digest(&b));
}

#[test]
fn test_near_hash_self_distance_is_zero() {
    let text = "the quick brown fox jumps over the lazy dog";
    let h = near_hash(text).unwrap();
    assert_eq!(hamming_distance(h, near_hash(text).unwrap()), 0);
}

#[test]
fn test_near_hash_ignores_repetition() {
    // Doubling every token doubles every counter without flipping any sign.
    let once = near_hash("alpha beta gamma delta").unwrap();
    let twice = near_hash("alpha beta gamma delta alpha beta gamma delta").unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_fingerprint_without_text_has_no_near_hash() {
    let source = MapSource::new(&[(1, b"binary blob")]);
    let item = Item::new(1, "/blob.bin", 11);
    let fp = hasher::fingerprint(&item, &source).unwrap();
    assert_eq!(fp.exact_digest, Some(exact_digest(b"binary blob")));
    assert_eq!(fp.near_hash, None);
}

#[test]
fn test_fingerprint_with_blank_text_has_no_near_hash() {
    let source = MapSource::new(&[(1, b"   ")]);
    let item = Item::new(1, "/blank.txt", 3).with_text("   ");
    let fp = hasher::fingerprint(&item, &source).unwrap();
    assert!(fp.exact_digest.is_some());
    assert_eq!(fp.near_hash, None);
}

#[test]
fn test_batch_reports_unreadable_items_and_completes() {
    let source = MapSource::new(&[(1, b"one"), (3, b"three")]);
    let items = vec![
        Item::new(1, "/one", 3),
        Item::new(2, "/missing", 7),
        Item::new(3, "/three", 5),
    ];

    let batch = engine().fingerprint_all(&items, &source);

    let ids: Vec<ItemId> = batch.entries.iter().map(|(item, _)| item.id).collect();
    assert_eq!(ids, vec![ItemId(1), ItemId(3)]);
    assert_eq!(batch.skipped.len(), 1);
    assert_eq!(batch.skipped[0].item, ItemId(2));
    assert!(matches!(batch.skipped[0].reason, SkipReason::Unreadable(_)));
}

#[test]
fn test_cancelled_batch_skips_every_item_without_reading() {
    let source = MapSource::new(&[(1, b"one"), (2, b"two")]);
    let items = vec![Item::new(1, "/one", 3), Item::new(2, "/two", 3)];

    let cancel = CancelFlag::new();
    cancel.cancel();
    let engine = engine().with_cancel_flag(cancel);
    let batch = engine.fingerprint_all(&items, &source);

    assert!(batch.entries.is_empty());
    assert_eq!(batch.skipped.len(), 2);
    assert!(batch.skipped.iter().all(|s| s.reason == SkipReason::Cancelled));
    assert_eq!(source.full_reads.load(Ordering::SeqCst), 0);
}

#[test]
fn test_batch_preserves_input_order() {
    let entries: Vec<(i64, Vec<u8>)> = (1..=50).map(|i| (i, format!("file {}", i).into_bytes())).collect();
    let borrowed: Vec<(i64, &[u8])> = entries.iter().map(|(i, d)| (*i, d.as_slice())).collect();
    let source = MapSource::new(&borrowed);
    let items: Vec<Item> = entries
        .iter()
        .map(|(i, d)| Item::new(*i, format!("/f{}", i), d.len() as u64))
        .collect();

    let pool = rayon::ThreadPoolBuilder::new().num_threads(4).build().unwrap();
    let batch = hasher::fingerprint_batch(&pool, &items, &source, &CancelFlag::new(), &SilentReporter);

    let ids: Vec<i64> = batch.entries.iter().map(|(item, _)| item.id.0).collect();
    assert_eq!(ids, (1..=50).collect::<Vec<_>>());
}
