use crate::model::ContentDigest;
use std::hash::Hasher as _;
use twox_hash::XxHash64;

pub const PARTIAL_HASH_LENGTH: usize = 1024; // 1KB

/// Cryptographic 256-bit digest of the raw bytes (blake3).
pub fn exact_digest(data: &[u8]) -> ContentDigest {
    ContentDigest(*blake3::hash(data).as_bytes())
}

/// Cheap non-cryptographic hash used to rule out non-matches before the
/// full digest is computed. Never used as an equality key on its own.
pub fn partial_hash(data: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(data);
    hasher.finish()
}
