//! Stable, process-independent hashing for geo jitter and ranking noise.
//!
//! SHA-256 is used only because its output is fixed across processes,
//! platforms and compiler releases, unlike `std`'s `DefaultHasher`. Nothing
//! here relies on it being cryptographic: the input is a public entity id,
//! so anyone can recompute the jitter.
//!
//! This is NOT a security boundary. Determinism only prevents averaging
//! repeated samples; an observer with many vantage points can still
//! approximate a location.

use sha2::{Digest, Sha256};

/// Hash `input` to a 64-bit value that is identical across processes,
/// platforms and releases.
pub fn stable_hash64(input: &str) -> u64 {
    let digest = Sha256::digest(input.as_bytes());
    let mut word = [0u8; 8];
    word.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(word)
}

/// Hash `input` and take a second, independent 64-bit word from the digest.
pub fn stable_hash64_pair(input: &str) -> (u64, u64) {
    let digest = Sha256::digest(input.as_bytes());
    let mut first = [0u8; 8];
    let mut second = [0u8; 8];
    first.copy_from_slice(&digest[..8]);
    second.copy_from_slice(&digest[8..16]);
    (u64::from_be_bytes(first), u64::from_be_bytes(second))
}
