//! `EncryptingOutboxDecorator`: wraps an `OutboxStore` and encrypts payloads
//! on the way in, per the mode in `DecoratorOptions`.

use crate::mode::{DecoratorOptions, EncryptionMode};
use compliance_crypto::{EncryptionProvider, EncryptionProviderRegistry};
use compliance_types::{ComplianceError, EncryptionContext, OutboxStore, Result};
use std::sync::Arc;

pub struct EncryptingOutboxDecorator {
    inner: Arc<dyn OutboxStore>,
    registry: Arc<EncryptionProviderRegistry>,
    context: EncryptionContext,
    options: DecoratorOptions,
}

impl EncryptingOutboxDecorator {
    pub fn new(
        inner: Arc<dyn OutboxStore>,
        registry: Arc<EncryptionProviderRegistry>,
        context: EncryptionContext,
        options: DecoratorOptions,
    ) -> Self {
        Self { inner, registry, context, options }
    }

    pub async fn stage(&self, key: &str, plaintext: Vec<u8>) -> Result<()> {
        match self.options.mode {
            EncryptionMode::Disabled => self.inner.stage(key, plaintext).await,
            EncryptionMode::DecryptOnlyReadOnly => {
                Err(ComplianceError::invariant("outbox is decrypt-only: staging new payloads is refused"))
            }
            EncryptionMode::EncryptAndDecrypt => {
                let provider = self.registry.get_primary()?;
                let encrypted = provider.encrypt(&plaintext, &self.context).await?;
                self.inner.stage(key, encrypted.to_wire()).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use compliance_crypto::{AesGcmProvider, KeyMaterialSource, ResolvedKey};
    use dashmap::DashMap;

    struct MemoryOutbox {
        staged: DashMap<String, Vec<u8>>,
    }

    #[async_trait]
    impl OutboxStore for MemoryOutbox {
        async fn stage(&self, key: &str, payload: Vec<u8>) -> Result<()> {
            self.staged.insert(key.to_string(), payload);
            Ok(())
        }
    }

    struct StubKeys;
    #[async_trait]
    impl KeyMaterialSource for StubKeys {
        async fn material_for(&self, key_id: &str, version: u32) -> Result<ResolvedKey> {
            Ok(ResolvedKey { key_id: key_id.to_string(), version, material: vec![7u8; 32] })
        }
        async fn active_material(&self, _purpose: Option<&str>) -> Result<ResolvedKey> {
            self.material_for("k1", 1).await
        }
    }

    fn registry_with_primary() -> Arc<EncryptionProviderRegistry> {
        let registry = EncryptionProviderRegistry::new();
        let provider = Arc::new(AesGcmProvider::new("primary", Arc::new(StubKeys)));
        registry.register("primary", provider).unwrap();
        registry.set_primary("primary").unwrap();
        Arc::new(registry)
    }

    #[tokio::test]
    async fn disabled_mode_passes_through_plaintext() {
        let outbox = Arc::new(MemoryOutbox { staged: DashMap::new() });
        let decorator = EncryptingOutboxDecorator::new(
            outbox.clone(),
            registry_with_primary(),
            EncryptionContext::default(),
            DecoratorOptions { mode: EncryptionMode::Disabled, ..Default::default() },
        );
        decorator.stage("k", b"hello".to_vec()).await.unwrap();
        assert_eq!(outbox.staged.get("k").unwrap().clone(), b"hello".to_vec());
    }

    #[tokio::test]
    async fn encrypt_and_decrypt_mode_stages_envelope() {
        let outbox = Arc::new(MemoryOutbox { staged: DashMap::new() });
        let decorator = EncryptingOutboxDecorator::new(
            outbox.clone(),
            registry_with_primary(),
            EncryptionContext::default(),
            DecoratorOptions { mode: EncryptionMode::EncryptAndDecrypt, ..Default::default() },
        );
        decorator.stage("k", b"hello".to_vec()).await.unwrap();
        let staged = outbox.staged.get("k").unwrap().clone();
        assert!(compliance_types::is_field_encrypted(&staged));
    }

    #[tokio::test]
    async fn decrypt_only_read_only_mode_refuses_writes() {
        let outbox = Arc::new(MemoryOutbox { staged: DashMap::new() });
        let decorator = EncryptingOutboxDecorator::new(
            outbox,
            registry_with_primary(),
            EncryptionContext::default(),
            DecoratorOptions { mode: EncryptionMode::DecryptOnlyReadOnly, ..Default::default() },
        );
        assert!(decorator.stage("k", b"hello".to_vec()).await.is_err());
    }
}
