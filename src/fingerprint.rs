//! Content fingerprinting using BLAKE3.
//!
//! Fingerprint = hash("clip" || len(subject) || subject || len(type) || type || prompt),
//! truncated to a fixed hex width. Length prefixes keep field boundaries
//! unambiguous so `("ab", "c")` and `("a", "bc")` never collide.

use blake3::Hasher;

use crate::types::Fingerprint;

/// Hex characters kept from the full digest. 64 bits of hash width; collision
/// probability is negligible at cache scale.
pub const FINGERPRINT_HEX_LEN: usize = 16;

/// Compute the cache fingerprint for a generation request.
///
/// Pure function: identical inputs yield the identical key across calls and
/// process restarts.
pub fn fingerprint(subject_id: &str, artifact_type: &str, prompt_text: &str) -> Fingerprint {
    let mut hasher = Hasher::new();

    // Domain discriminator
    hasher.update(b"clip");

    // Length-prefixed fields (8 bytes, big-endian for determinism)
    hasher.update(&(subject_id.len() as u64).to_be_bytes());
    hasher.update(subject_id.as_bytes());
    hasher.update(&(artifact_type.len() as u64).to_be_bytes());
    hasher.update(artifact_type.as_bytes());
    hasher.update(prompt_text.as_bytes());

    let digest = hasher.finalize();
    let hex = hex::encode(&digest.as_bytes()[..FINGERPRINT_HEX_LEN / 2]);
    Fingerprint(hex)
}
