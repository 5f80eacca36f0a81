//! 64-bit SimHash over whitespace tokens.
//!
//! Similar texts produce fingerprints with a small Hamming distance, so near
//! duplicates can be found with XOR + popcount instead of text comparison.

use std::hash::Hasher as _;
use twox_hash::XxHash64;

const WIDTH: usize = 64;

/// SimHash of `text`, or `None` when it has no tokens.
pub fn near_hash(text: &str) -> Option<u64> {
    let mut acc = [0i64; WIDTH];
    let mut tokens = 0usize;

    for token in text.split_whitespace() {
        let h = token_hash(&token.to_lowercase());
        for (bit, slot) in acc.iter_mut().enumerate() {
            if (h >> bit) & 1 == 1 {
                *slot += 1;
            } else {
                *slot -= 1;
            }
        }
        tokens += 1;
    }

    if tokens == 0 {
        return None;
    }

    let mut out = 0u64;
    for (bit, &slot) in acc.iter().enumerate() {
        if slot > 0 {
            out |= 1u64 << bit;
        }
    }
    Some(out)
}

/// Number of differing bits.
pub fn hamming_distance(x: u64, y: u64) -> u32 {
    (x ^ y).count_ones()
}

fn token_hash(token: &str) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(token.as_bytes());
    hasher.finish()
}
