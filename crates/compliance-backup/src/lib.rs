//! # Master-Key Backup
//!
//! Shamir k-of-n recovery splits and encrypted whole-key exports for
//! master-key material, layered on `compliance-crypto`'s Shamir
//! implementation and envelope encryption.

pub mod model;
pub mod service;

pub use model::{BackupShare, MasterKeyBackup, ReconstructResult, VerifyBackupResult};
pub use service::{ExportOptions, InMemoryMasterKeyBackupService, ReconstructOptions, SplitOptions};

#[cfg(test)]
mod tests {
    use super::*;
    use compliance_crypto::{key_source::ResolvedKey, AesGcmProvider, KeyMaterialSource};
    use compliance_types::{ComplianceError, EncryptionAlgorithm, KeyManagementProvider, KeyMetadata, KeyStatus, Result};
    use std::sync::Arc;

    struct FixedKey {
        key_id: String,
        material: Vec<u8>,
    }

    #[async_trait::async_trait]
    impl KeyManagementProvider for FixedKey {
        async fn get_key(&self, key_id: &str) -> Result<KeyMetadata> {
            if key_id != self.key_id {
                return Err(ComplianceError::KeyNotFound(key_id.to_string()));
            }
            Ok(KeyMetadata {
                key_id: key_id.to_string(),
                version: 1,
                algorithm: EncryptionAlgorithm::Aes256Gcm,
                status: KeyStatus::Active,
                created_at: chrono::Utc::now(),
                expires_at: None,
                last_rotated_at: None,
                purpose: None,
                is_fips_compliant: true,
            })
        }
        async fn get_active_key(&self, _purpose: Option<&str>) -> Result<KeyMetadata> {
            self.get_key(&self.key_id).await
        }
        async fn rotate_key(
            &self,
            key_id: &str,
            _algorithm: EncryptionAlgorithm,
            _purpose: Option<&str>,
            _expires_at: Option<chrono::DateTime<chrono::Utc>>,
        ) -> Result<KeyMetadata> {
            self.get_key(key_id).await
        }
        async fn list_keys(&self, _status: Option<KeyStatus>, _purpose: Option<&str>) -> Result<Vec<KeyMetadata>> {
            Ok(vec![self.get_key(&self.key_id).await?])
        }
        async fn delete_key(&self, _key_id: &str, _grace_period_days: u32) -> Result<()> {
            Ok(())
        }
        async fn suspend_key(&self, _key_id: &str, _reason: &str) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl KeyMaterialSource for FixedKey {
        async fn material_for(&self, key_id: &str, _version: u32) -> Result<ResolvedKey> {
            if key_id != self.key_id {
                return Err(ComplianceError::KeyNotFound(key_id.to_string()));
            }
            Ok(ResolvedKey {
                key_id: key_id.to_string(),
                version: 1,
                material: self.material.clone(),
            })
        }
        async fn active_material(&self, _purpose: Option<&str>) -> Result<ResolvedKey> {
            self.material_for(&self.key_id, 1).await
        }
    }

    fn service() -> InMemoryMasterKeyBackupService {
        let provider = Arc::new(FixedKey {
            key_id: "master-1".to_string(),
            material: vec![42u8; 32],
        });
        let encryption = Arc::new(AesGcmProvider::new("aes-backup", provider.clone()));
        InMemoryMasterKeyBackupService::new(provider.clone(), provider, encryption)
    }

    #[tokio::test]
    async fn export_then_verify_round_trips() {
        let svc = service();
        let backup = svc.export_master_key("master-1", None).await.unwrap();
        let verdict = svc.verify_backup(&backup);
        assert!(verdict.is_valid);
        assert!(!verdict.is_expired);
        assert!(verdict.format_supported);
    }

    #[tokio::test]
    async fn three_of_five_split_reconstructs() {
        let svc = service();
        let shares = svc.generate_recovery_split("master-1", 5, 3, None).await.unwrap();
        assert_eq!(shares.len(), 5);
        let subset = vec![shares[0].clone(), shares[2].clone(), shares[4].clone()];
        let result = svc.reconstruct_from_shares(&subset, None).unwrap();
        assert!(result.success);
        assert_eq!(result.key_id, "master-1");
    }

    #[tokio::test]
    async fn reconstruct_rejects_mismatched_shares() {
        let svc = service();
        let mut shares = svc.generate_recovery_split("master-1", 5, 3, None).await.unwrap();
        shares[1].key_version = 99;
        assert!(svc.reconstruct_from_shares(&shares[0..3], None).is_err());
    }

    #[tokio::test]
    async fn custodian_ids_must_match_total() {
        let svc = service();
        let options = SplitOptions {
            custodian_ids: Some(vec!["only-one".to_string()]),
            ..Default::default()
        };
        assert!(svc.generate_recovery_split("master-1", 5, 3, Some(options)).await.is_err());
    }
}
