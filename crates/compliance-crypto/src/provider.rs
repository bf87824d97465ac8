//! The `EncryptionProvider` capability.
//!
//! Every provider — the AES-GCM primary, legacy algorithm providers, the
//! rotating wrapper — implements this one trait. There is no separate
//! "decryption provider" type: `can_decrypt` lets the registry pick the
//! right provider for an opaque envelope.

use async_trait::async_trait;
use compliance_types::{EncryptedData, EncryptionAlgorithm, EncryptionContext, Result};

#[async_trait]
pub trait EncryptionProvider: Send + Sync {
    /// Stable identifier this provider is registered under.
    fn provider_id(&self) -> &str;

    /// Algorithms this provider can produce ciphertext for.
    fn supported_algorithms(&self) -> &[EncryptionAlgorithm];

    async fn encrypt(&self, plaintext: &[u8], ctx: &EncryptionContext) -> Result<EncryptedData>;
    async fn decrypt(&self, encrypted: &EncryptedData, ctx: &EncryptionContext) -> Result<Vec<u8>>;

    /// Default implementation matches `encrypted.algorithm` against
    /// `supported_algorithms`; providers with extra constraints
    /// (e.g. a legacy algorithm only decryptable with a specific key
    /// prefix) can override.
    fn can_decrypt(&self, encrypted: &EncryptedData) -> bool {
        self.supported_algorithms().contains(&encrypted.algorithm)
    }

    /// `true` if this provider's current configuration meets FIPS 140-2/3
    /// requirements. The AES-GCM provider is always FIPS-capable; wrapped
    /// providers delegate.
    fn validate_fips_compliance(&self) -> bool {
        true
    }
}
