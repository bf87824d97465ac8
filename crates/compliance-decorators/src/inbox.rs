//! `EncryptingInboxDecorator`: wraps an `InboxStore` and decrypts payloads
//! on the way out, per the mode in `DecoratorOptions`. Also carries
//! opportunistic re-encryption on access ("lazy migration") when a payload
//! was decrypted through a legacy (non-primary) provider.

use crate::mode::{DecoratorOptions, EncryptionMode};
use compliance_crypto::{EncryptionProvider, EncryptionProviderRegistry};
use compliance_types::{is_field_encrypted, ComplianceError, EncryptedData, EncryptionContext, EncryptionErrorCode, InboxStore, Result};
use std::sync::Arc;

pub struct EncryptingInboxDecorator {
    inner: Arc<dyn InboxStore>,
    registry: Arc<EncryptionProviderRegistry>,
    context: EncryptionContext,
    options: DecoratorOptions,
}

impl EncryptingInboxDecorator {
    pub fn new(
        inner: Arc<dyn InboxStore>,
        registry: Arc<EncryptionProviderRegistry>,
        context: EncryptionContext,
        options: DecoratorOptions,
    ) -> Self {
        Self { inner, registry, context, options }
    }

    pub async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let Some(buf) = self.inner.read(key).await? else {
            return Ok(None);
        };

        if matches!(self.options.mode, EncryptionMode::Disabled) || !is_field_encrypted(&buf) {
            return Ok(Some(buf));
        }

        let encrypted = EncryptedData::from_wire(&buf)
            .ok_or_else(|| ComplianceError::crypto(EncryptionErrorCode::MalformedEnvelope, "encrypted envelope failed to parse"))?;
        let provider = self
            .registry
            .find_decryption_provider(&encrypted)
            .ok_or_else(|| ComplianceError::crypto(EncryptionErrorCode::ProviderNotFound, format!("no registered provider can decrypt algorithm {:?}", encrypted.algorithm)))?;
        let plaintext = provider.decrypt(&encrypted, &self.context).await?;

        self.maybe_rewrap(key, &provider, &plaintext).await;

        Ok(Some(plaintext))
    }

    async fn maybe_rewrap(&self, key: &str, decrypting_provider: &Arc<dyn EncryptionProvider>, plaintext: &[u8]) {
        if !self.options.rewrap_eligible() {
            return;
        }
        let Ok(primary) = self.registry.get_primary() else {
            return;
        };
        if primary.provider_id() == decrypting_provider.provider_id() {
            return;
        }
        if !self.options.should_persist_rewrap() {
            return;
        }
        match primary.encrypt(plaintext, &self.context).await {
            Ok(rewrapped) => {
                if let Err(err) = self.inner.write_back(key, rewrapped.to_wire()).await {
                    tracing::warn!(%key, %err, "lazy re-encryption write-back failed");
                }
            }
            Err(err) => {
                tracing::warn!(%key, %err, "lazy re-encryption failed to produce an upgraded ciphertext");
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

    struct MemoryInbox {
        entries: DashMap<String, Vec<u8>>,
    }

    #[async_trait]
    impl InboxStore for MemoryInbox {
        async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
            Ok(self.entries.get(key).map(|v| v.clone()))
        }
        async fn write_back(&self, key: &str, payload: Vec<u8>) -> Result<()> {
            self.entries.insert(key.to_string(), payload);
            Ok(())
        }
    }

    struct StubKeys(u8);
    #[async_trait]
    impl KeyMaterialSource for StubKeys {
        async fn material_for(&self, key_id: &str, version: u32) -> Result<ResolvedKey> {
            Ok(ResolvedKey { key_id: key_id.to_string(), version, material: vec![self.0; 32] })
        }
        async fn active_material(&self, _purpose: Option<&str>) -> Result<ResolvedKey> {
            self.material_for("k1", 1).await
        }
    }

    fn registry_with(primary_id: &str, legacy_id: Option<&str>) -> Arc<EncryptionProviderRegistry> {
        let registry = EncryptionProviderRegistry::new();
        registry.register(primary_id, Arc::new(AesGcmProvider::new(primary_id, Arc::new(StubKeys(1))))).unwrap();
        registry.set_primary(primary_id).unwrap();
        if let Some(legacy_id) = legacy_id {
            registry.register(legacy_id, Arc::new(AesGcmProvider::new(legacy_id, Arc::new(StubKeys(2))))).unwrap();
            registry.add_legacy_provider(legacy_id).unwrap();
        }
        Arc::new(registry)
    }

    #[tokio::test]
    async fn disabled_mode_passes_through_raw_bytes() {
        let entries = DashMap::new();
        entries.insert("k".to_string(), b"plain".to_vec());
        let inbox = Arc::new(MemoryInbox { entries });
        let decorator = EncryptingInboxDecorator::new(
            inbox,
            registry_with("primary", None),
            EncryptionContext::default(),
            DecoratorOptions { mode: EncryptionMode::Disabled, ..Default::default() },
        );
        assert_eq!(decorator.read("k").await.unwrap().unwrap(), b"plain".to_vec());
    }

    #[tokio::test]
    async fn decrypts_payload_encrypted_by_primary() {
        let registry = registry_with("primary", None);
        let primary = registry.get_primary().unwrap();
        let encrypted = primary.encrypt(b"secret", &EncryptionContext::default()).await.unwrap();

        let entries = DashMap::new();
        entries.insert("k".to_string(), encrypted.to_wire());
        let inbox = Arc::new(MemoryInbox { entries });
        let decorator = EncryptingInboxDecorator::new(
            inbox,
            registry,
            EncryptionContext::default(),
            DecoratorOptions { mode: EncryptionMode::EncryptAndDecrypt, ..Default::default() },
        );
        assert_eq!(decorator.read("k").await.unwrap().unwrap(), b"secret".to_vec());
    }

    #[tokio::test]
    async fn lazy_migration_rewraps_legacy_ciphertext_on_read() {
        let registry = registry_with("primary", Some("legacy"));
        let legacy = registry.get_provider("legacy").unwrap();
        let encrypted = legacy.encrypt(b"secret", &EncryptionContext::default()).await.unwrap();

        let entries = DashMap::new();
        entries.insert("k".to_string(), encrypted.to_wire());
        let inbox = Arc::new(MemoryInbox { entries });
        let decorator = EncryptingInboxDecorator::new(
            inbox.clone(),
            registry,
            EncryptionContext::default(),
            DecoratorOptions {
                mode: EncryptionMode::EncryptAndDecrypt,
                lazy_migration_enabled: true,
                lazy_migration_mode: crate::mode::LazyMigrationMode::Both,
            },
        );

        assert_eq!(decorator.read("k").await.unwrap().unwrap(), b"secret".to_vec());

        // The store should now hold ciphertext rewrapped under the primary.
        let rewrapped_wire = inbox.entries.get("k").unwrap().clone();
        let rewrapped = EncryptedData::from_wire(&rewrapped_wire).unwrap();
        assert_eq!(rewrapped.key_id.as_str(), "k1");
        assert_ne!(rewrapped_wire, encrypted.to_wire());
    }

    #[tokio::test]
    async fn lazy_migration_read_only_mode_does_not_persist() {
        let registry = registry_with("primary", Some("legacy"));
        let legacy = registry.get_provider("legacy").unwrap();
        let encrypted = legacy.encrypt(b"secret", &EncryptionContext::default()).await.unwrap();
        let original_wire = encrypted.to_wire();

        let entries = DashMap::new();
        entries.insert("k".to_string(), original_wire.clone());
        let inbox = Arc::new(MemoryInbox { entries });
        let decorator = EncryptingInboxDecorator::new(
            inbox.clone(),
            registry,
            EncryptionContext::default(),
            DecoratorOptions {
                mode: EncryptionMode::EncryptAndDecrypt,
                lazy_migration_enabled: true,
                lazy_migration_mode: crate::mode::LazyMigrationMode::Read,
            },
        );

        decorator.read("k").await.unwrap();
        assert_eq!(inbox.entries.get("k").unwrap().clone(), original_wire);
    }

    #[tokio::test]
    async fn unparseable_envelope_is_a_crypto_error() {
        let entries = DashMap::new();
        entries.insert("k".to_string(), compliance_types::MAGIC.to_vec());
        let inbox = Arc::new(MemoryInbox { entries });
        let decorator = EncryptingInboxDecorator::new(
            inbox,
            registry_with("primary", None),
            EncryptionContext::default(),
            DecoratorOptions::default(),
        );
        assert!(decorator.read("k").await.is_err());
    }
}
