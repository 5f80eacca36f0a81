//! Content fingerprinting: exact digests, partial pre-filter hashes and SimHash.

pub mod batch;
pub mod digest;
pub mod simhash;

use crate::model::{ContentFingerprint, Item};
use crate::source::FileSource;
use std::io;

pub use batch::{fingerprint_batch, CancelFlag, FingerprintBatch};
pub use digest::{exact_digest, partial_hash, PARTIAL_HASH_LENGTH};
pub use simhash::{hamming_distance, near_hash};

/// Fingerprint one item. Fails only when its bytes cannot be read; a missing
/// or untokenizable text just leaves `near_hash` empty.
pub fn fingerprint(item: &Item, source: &dyn FileSource) -> io::Result<ContentFingerprint> {
    let data = source.read_bytes(item)?;
    Ok(ContentFingerprint {
        exact_digest: Some(exact_digest(&data)),
        near_hash: item.text.as_deref().and_then(near_hash),
    })
}
