//! Subject-id hashing used to replace plaintext identifiers in persisted
//! erasure state.

use sha2::{Digest, Sha256};

/// Uppercase hex SHA-256 of a plaintext data-subject id. Deterministic and
/// irreversible: the erasure service never persists the plaintext subject id
/// once a request has been scheduled.
pub fn hash_data_subject_id(plaintext: &str) -> String {
    let digest = Sha256::digest(plaintext.as_bytes());
    hex::encode_upper(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_is_64_uppercase_hex_chars() {
        let hash = hash_data_subject_id("user-1");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn same_input_same_output() {
        assert_eq!(hash_data_subject_id("user-1"), hash_data_subject_id("user-1"));
    }

    #[test]
    fn different_input_different_output() {
        assert_ne!(hash_data_subject_id("user-1"), hash_data_subject_id("user-2"));
    }
}
