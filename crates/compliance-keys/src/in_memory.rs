//! Reference in-memory `KeyManagementProvider` ("persistence backends
//! beyond in-memory reference implementations" are out of scope). Also
//! implements [`compliance_crypto::KeyMaterialSource`] so the encryption
//! providers can resolve raw key bytes from the same backing store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use compliance_crypto::{KeyMaterialSource, ResolvedKey};
use compliance_types::{
    ComplianceError, EncryptionAlgorithm, KeyManagementProvider, KeyMetadata, KeyStatus, Result,
};
use dashmap::DashMap;
use parking_lot::RwLock;
use rand::RngCore;
use std::sync::Arc;
use zeroize::Zeroize;

struct StoredKey {
    metadata: KeyMetadata,
    material: Vec<u8>,
}

/// In-memory key-management backend. Keeps every version of every key so
/// decrypt-only lookups keep working after rotation, per the "previous
/// versions remain for decrypt until status -> Destroyed".
pub struct InMemoryKeyManagementProvider {
    // keyed by `"{key_id}:{version}"`
    versions: DashMap<String, StoredKey>,
    // key_id -> latest version number
    latest_version: DashMap<String, u32>,
    // purpose -> key_id of the current active key for that purpose
    active_by_purpose: DashMap<String, String>,
    default_purpose: RwLock<Option<String>>,
}

impl Default for InMemoryKeyManagementProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryKeyManagementProvider {
    pub fn new() -> Self {
        Self {
            versions: DashMap::new(),
            latest_version: DashMap::new(),
            active_by_purpose: DashMap::new(),
            default_purpose: RwLock::new(None),
        }
    }

    fn version_key(key_id: &str, version: u32) -> String {
        format!("{key_id}:{version}")
    }

    fn purpose_slot(purpose: Option<&str>) -> String {
        purpose.unwrap_or("__default__").to_string()
    }

    /// Seeds a brand-new active key (e.g. at service start-up or in
    /// tests). Generates 32 random bytes of AES-256 key material.
    pub fn seed_key(&self, key_id: &str, algorithm: EncryptionAlgorithm, purpose: Option<&str>) -> KeyMetadata {
        let mut material = vec![0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut material);
        let metadata = KeyMetadata {
            key_id: key_id.to_string(),
            version: 1,
            algorithm,
            status: KeyStatus::Active,
            created_at: Utc::now(),
            expires_at: None,
            last_rotated_at: None,
            purpose: purpose.map(|p| p.to_string()),
            is_fips_compliant: true,
        };
        self.versions.insert(
            Self::version_key(key_id, 1),
            StoredKey {
                metadata: metadata.clone(),
                material,
            },
        );
        self.latest_version.insert(key_id.to_string(), 1);
        let slot = Self::purpose_slot(purpose);
        self.active_by_purpose.insert(slot.clone(), key_id.to_string());
        if purpose.is_none() {
            *self.default_purpose.write() = Some(slot);
        }
        metadata
    }

    fn active_key_id(&self, purpose: Option<&str>) -> Option<String> {
        self.active_by_purpose.get(&Self::purpose_slot(purpose)).map(|e| e.clone())
    }
}

#[async_trait]
impl KeyManagementProvider for InMemoryKeyManagementProvider {
    async fn get_key(&self, key_id: &str) -> Result<KeyMetadata> {
        let latest = self
            .latest_version
            .get(key_id)
            .map(|v| *v)
            .ok_or_else(|| ComplianceError::KeyNotFound(key_id.to_string()))?;
        self.versions
            .get(&Self::version_key(key_id, latest))
            .map(|e| e.metadata.clone())
            .ok_or_else(|| ComplianceError::KeyNotFound(key_id.to_string()))
    }

    async fn get_active_key(&self, purpose: Option<&str>) -> Result<KeyMetadata> {
        let key_id = self
            .active_key_id(purpose)
            .ok_or_else(|| ComplianceError::KeyNotFound(format!("no active key for purpose {purpose:?}")))?;
        self.get_key(&key_id).await
    }

    async fn rotate_key(
        &self,
        key_id: &str,
        algorithm: EncryptionAlgorithm,
        purpose: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<KeyMetadata> {
        let current = self.get_key(key_id).await?;
        let next_version = current.version + 1;

        // Previous version becomes decrypt-only; it is retained, not
        // deleted, per the key-lifecycle invariant.
        if let Some(mut prev) = self.versions.get_mut(&Self::version_key(key_id, current.version)) {
            prev.metadata.status = KeyStatus::DecryptOnly;
        }

        let mut material = vec![0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut material);
        let metadata = KeyMetadata {
            key_id: key_id.to_string(),
            version: next_version,
            algorithm,
            status: KeyStatus::Active,
            created_at: Utc::now(),
            expires_at,
            last_rotated_at: Some(Utc::now()),
            purpose: purpose.map(|p| p.to_string()).or(current.purpose),
            is_fips_compliant: true,
        };
        self.versions.insert(
            Self::version_key(key_id, next_version),
            StoredKey {
                metadata: metadata.clone(),
                material,
            },
        );
        self.latest_version.insert(key_id.to_string(), next_version);
        self.active_by_purpose
            .insert(Self::purpose_slot(purpose.or(metadata.purpose.as_deref())), key_id.to_string());
        Ok(metadata)
    }

    async fn list_keys(&self, status: Option<KeyStatus>, purpose: Option<&str>) -> Result<Vec<KeyMetadata>> {
        Ok(self
            .versions
            .iter()
            .map(|e| e.metadata.clone())
            .filter(|m| status.map(|s| s == m.status).unwrap_or(true))
            .filter(|m| purpose.map(|p| m.purpose.as_deref() == Some(p)).unwrap_or(true))
            .collect())
    }

    async fn delete_key(&self, key_id: &str, _grace_period_days: u32) -> Result<()> {
        let versions: Vec<String> = self
            .versions
            .iter()
            .filter(|e| e.metadata.key_id == key_id)
            .map(|e| e.key().clone())
            .collect();
        if versions.is_empty() {
            return Err(ComplianceError::KeyNotFound(key_id.to_string()));
        }
        for v in versions {
            if let Some((_, mut stored)) = self.versions.remove(&v) {
                stored.material.zeroize();
            }
        }
        self.latest_version.remove(key_id);
        self.active_by_purpose.retain(|_, v| v != key_id);
        Ok(())
    }

    async fn suspend_key(&self, key_id: &str, _reason: &str) -> Result<()> {
        let latest = self
            .latest_version
            .get(key_id)
            .map(|v| *v)
            .ok_or_else(|| ComplianceError::KeyNotFound(key_id.to_string()))?;
        if let Some(mut stored) = self.versions.get_mut(&Self::version_key(key_id, latest)) {
            stored.metadata.status = KeyStatus::Suspended;
        }
        Ok(())
    }
}

#[async_trait]
impl KeyMaterialSource for InMemoryKeyManagementProvider {
    async fn material_for(&self, key_id: &str, version: u32) -> Result<ResolvedKey> {
        self.versions
            .get(&Self::version_key(key_id, version))
            .map(|e| ResolvedKey {
                key_id: key_id.to_string(),
                version,
                material: e.material.clone(),
            })
            .ok_or_else(|| ComplianceError::KeyNotFound(format!("{key_id} v{version}")))
    }

    async fn active_material(&self, purpose: Option<&str>) -> Result<ResolvedKey> {
        let metadata = self.get_active_key(purpose).await?;
        self.material_for(&metadata.key_id, metadata.version).await
    }
}

/// Convenience alias so downstream crates can hold one `Arc` and satisfy
/// both contracts the in-memory provider implements.
pub type SharedInMemoryKeyManagementProvider = Arc<InMemoryKeyManagementProvider>;
