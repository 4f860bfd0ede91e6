//! Content fingerprint for staleness detection.
//!
//! `text` and `description` are joined with [`FIELD_SEPARATOR`] and hashed
//! with 32-bit xxHash under a fixed seed, so the result is stable across
//! processes, platforms and locales. The output is always 8 lowercase hex
//! characters.

use xxhash_rust::xxh32::xxh32;

use crate::types::ContentHash;

/// Fixed seed; changing it invalidates every stored target hash.
pub const HASH_SEED: u32 = 0x9747_b28c;

/// Joins `text` and `description` before hashing.
pub const FIELD_SEPARATOR: char = '|';

/// Fingerprint a `(text, description)` pair.
pub fn content_hash(text: &str, description: &str) -> ContentHash {
    let mut combined = String::with_capacity(text.len() + description.len() + 1);
    combined.push_str(text);
    combined.push(FIELD_SEPARATOR);
    combined.push_str(description);
    ContentHash(format!("{:08x}", xxh32(combined.as_bytes(), HASH_SEED)))
}
