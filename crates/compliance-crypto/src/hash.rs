//! BLAKE3 hashing utilities.
//!
//! Used for content-addressed fingerprints (e.g. `MasterKeyBackup::key_hash`)
//! where SHA-256 isn't already mandated by a wire format.

/// Hash data using BLAKE3 (256-bit output).
pub fn hash_blake3(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Keyed hash using BLAKE3, suitable as a MAC.
pub fn hash_keyed(key: &[u8; 32], data: &[u8]) -> [u8; 32] {
    *blake3::keyed_hash(key, data).as_bytes()
}

/// Hash multiple items together without allocating their concatenation.
pub fn hash_concat(items: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for item in items {
        hasher.update(item);
    }
    *hasher.finalize().as_bytes()
}

/// Hex-encode a hash for storage in human-readable fields such as
/// `MasterKeyBackup::key_hash`.
pub fn hash_blake3_hex(data: &[u8]) -> String {
    hex::encode(hash_blake3(data))
}
