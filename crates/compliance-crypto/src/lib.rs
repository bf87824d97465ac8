//! # Encryption Providers
//!
//! Envelope encryption, the provider registry, HKDF subkey
//! derivation, Shamir master-key splitting, and a BLAKE3 hashing utility.
//! Depends only on `compliance-types` for the data model and error
//! taxonomy — no store or key-management backend lives here.

pub mod aes_gcm;
pub mod hash;
pub mod kdf;
pub mod key_source;
pub mod provider;
pub mod registry;
pub mod rotating;
pub mod shamir;

pub use aes_gcm::AesGcmProvider;
pub use key_source::{KeyMaterialSource, ResolvedKey};
pub use provider::EncryptionProvider;
pub use registry::EncryptionProviderRegistry;
pub use rotating::{RotatingEncryptionProvider, RotatingEncryptionProviderOptions};
