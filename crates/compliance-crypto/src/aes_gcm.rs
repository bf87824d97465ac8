//! AES-256-GCM envelope encryption.
//!
//! A 12-byte random IV per encryption, a 16-byte auth tag, and associated
//! data from `EncryptionContext.associated_data` bound into the tag. Key
//! bytes are resolved per-call through a [`KeyMaterialSource`] so this
//! provider never owns raw key material longer than an operation needs.

use crate::key_source::KeyMaterialSource;
use crate::provider::EncryptionProvider;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use async_trait::async_trait;
use compliance_types::{
    EncryptedData, EncryptionAlgorithm, EncryptionContext, EncryptionErrorCode, ComplianceError, Result,
};
use rand::RngCore;
use std::sync::Arc;

const IV_LEN: usize = 12;
const SUPPORTED: [EncryptionAlgorithm; 1] = [EncryptionAlgorithm::Aes256Gcm];

pub struct AesGcmProvider {
    provider_id: String,
    keys: Arc<dyn KeyMaterialSource>,
}

impl AesGcmProvider {
    pub fn new(provider_id: impl Into<String>, keys: Arc<dyn KeyMaterialSource>) -> Self {
        Self {
            provider_id: provider_id.into(),
            keys,
        }
    }
}

#[async_trait]
impl EncryptionProvider for AesGcmProvider {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn supported_algorithms(&self) -> &[EncryptionAlgorithm] {
        &SUPPORTED
    }

    async fn encrypt(&self, plaintext: &[u8], ctx: &EncryptionContext) -> Result<EncryptedData> {
        let resolved = match (&ctx.key_id, ctx.key_version) {
            (Some(key_id), Some(version)) => self.keys.material_for(key_id, version).await?,
            _ => self.keys.active_material(ctx.purpose.as_deref()).await?,
        };
        if resolved.material.len() != 32 {
            return Err(ComplianceError::crypto(
                EncryptionErrorCode::KeyNotFound,
                format!("key {} is not a 256-bit AES key", resolved.key_id),
            ));
        }

        let key = Key::<Aes256Gcm>::from_slice(&resolved.material);
        let cipher = Aes256Gcm::new(key);

        let mut iv = vec![0u8; IV_LEN];
        rand::rngs::OsRng.fill_bytes(&mut iv);
        let nonce = Nonce::from_slice(&iv);

        let aad = ctx.associated_data.as_deref().unwrap_or(&[]);
        let sealed = cipher
            .encrypt(nonce, Payload { msg: plaintext, aad })
            .map_err(|e| ComplianceError::crypto(EncryptionErrorCode::AuthenticationFailed, e.to_string()))?;

        // aes-gcm appends the 16-byte tag to the ciphertext; split it back
        // out so the envelope carries them as separate fields.
        let tag_start = sealed.len().saturating_sub(16);
        let (ciphertext, tag) = sealed.split_at(tag_start);

        Ok(EncryptedData {
            ciphertext: ciphertext.to_vec(),
            iv,
            auth_tag: Some(tag.to_vec()),
            key_id: resolved.key_id,
            key_version: resolved.version,
            algorithm: EncryptionAlgorithm::Aes256Gcm,
            tenant_id: ctx.tenant_id.clone(),
        })
    }

    async fn decrypt(&self, encrypted: &EncryptedData, ctx: &EncryptionContext) -> Result<Vec<u8>> {
        if encrypted.algorithm != EncryptionAlgorithm::Aes256Gcm {
            return Err(ComplianceError::crypto(
                EncryptionErrorCode::UnsupportedAlgorithm,
                format!("{:?} not supported by provider {}", encrypted.algorithm, self.provider_id),
            ));
        }
        let resolved = self.keys.material_for(&encrypted.key_id, encrypted.key_version).await?;
        if resolved.material.len() != 32 {
            return Err(ComplianceError::crypto(
                EncryptionErrorCode::KeyNotFound,
                format!("key {} is not a 256-bit AES key", resolved.key_id),
            ));
        }
        if encrypted.iv.len() != IV_LEN {
            return Err(ComplianceError::crypto(
                EncryptionErrorCode::MalformedEnvelope,
                "IV must be 12 bytes for AES-256-GCM".to_string(),
            ));
        }
        let tag = encrypted.auth_tag.as_ref().ok_or_else(|| {
            ComplianceError::crypto(EncryptionErrorCode::MalformedEnvelope, "missing auth tag".to_string())
        })?;

        let key = Key::<Aes256Gcm>::from_slice(&resolved.material);
        let cipher = Aes256Gcm::new(key);
        let nonce = Nonce::from_slice(&encrypted.iv);

        let mut sealed = encrypted.ciphertext.clone();
        sealed.extend_from_slice(tag);

        let aad = ctx.associated_data.as_deref().unwrap_or(&[]);
        cipher
            .decrypt(nonce, Payload { msg: &sealed, aad })
            .map_err(|e| ComplianceError::crypto(EncryptionErrorCode::AuthenticationFailed, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compliance_types::MAGIC;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    struct FixedKeySource {
        keys: Mutex<HashMap<String, Vec<u8>>>,
        active: String,
    }

    #[async_trait]
    impl KeyMaterialSource for FixedKeySource {
        async fn material_for(&self, key_id: &str, version: u32) -> Result<crate::key_source::ResolvedKey> {
            let keys = self.keys.lock().await;
            let material = keys
                .get(key_id)
                .cloned()
                .ok_or_else(|| ComplianceError::KeyNotFound(key_id.to_string()))?;
            Ok(crate::key_source::ResolvedKey {
                key_id: key_id.to_string(),
                version,
                material,
            })
        }

        async fn active_material(&self, _purpose: Option<&str>) -> Result<crate::key_source::ResolvedKey> {
            self.material_for(&self.active.clone(), 1).await
        }
    }

    fn provider() -> AesGcmProvider {
        let mut keys = HashMap::new();
        keys.insert("k1".to_string(), vec![7u8; 32]);
        let source = Arc::new(FixedKeySource {
            keys: Mutex::new(keys),
            active: "k1".to_string(),
        });
        AesGcmProvider::new("aes-gcm-primary", source)
    }

    #[tokio::test]
    async fn round_trip_preserves_plaintext() {
        let p = provider();
        let ctx = EncryptionContext {
            key_id: Some("k1".to_string()),
            key_version: Some(1),
            ..Default::default()
        };
        let plaintext = [0x01, 0x02, 0x03];
        let encrypted = p.encrypt(&plaintext, &ctx).await.unwrap();
        let wire = encrypted.to_wire();
        assert_eq!(&wire[..4], &MAGIC);

        let decrypted = p.decrypt(&encrypted, &ctx).await.unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[tokio::test]
    async fn associated_data_is_authenticated() {
        let p = provider();
        let ctx = EncryptionContext {
            key_id: Some("k1".to_string()),
            key_version: Some(1),
            associated_data: Some(b"tenant-a".to_vec()),
            ..Default::default()
        };
        let encrypted = p.encrypt(b"secret", &ctx).await.unwrap();

        let wrong_ctx = EncryptionContext {
            associated_data: Some(b"tenant-b".to_vec()),
            ..ctx.clone()
        };
        assert!(p.decrypt(&encrypted, &wrong_ctx).await.is_err());
        assert!(p.decrypt(&encrypted, &ctx).await.is_ok());
    }

    #[test]
    fn can_decrypt_checks_algorithm() {
        let p = provider();
        let encrypted = EncryptedData {
            ciphertext: vec![],
            iv: vec![0; 12],
            auth_tag: Some(vec![0; 16]),
            key_id: "k1".to_string(),
            key_version: 1,
            algorithm: EncryptionAlgorithm::Aes256Gcm,
            tenant_id: None,
        };
        assert!(p.can_decrypt(&encrypted));
    }
}
