//! Raw key-material lookup, the seam between encryption providers and
//! whatever backend actually stores key bytes (compliance-keys' in-memory
//! provider, or a real KMS client in production). Kept separate from
//! `compliance_types::KeyManagementProvider` (which only deals in
//! [`compliance_types::KeyMetadata`]) so this crate never needs to depend
//! on a concrete key-management crate.

use async_trait::async_trait;
use compliance_types::Result;

/// Raw symmetric key bytes plus the identity they're registered under.
#[derive(Clone)]
pub struct ResolvedKey {
    pub key_id: String,
    pub version: u32,
    pub material: Vec<u8>,
}

#[async_trait]
pub trait KeyMaterialSource: Send + Sync {
    async fn material_for(&self, key_id: &str, version: u32) -> Result<ResolvedKey>;
    async fn active_material(&self, purpose: Option<&str>) -> Result<ResolvedKey>;
}
