//! `InMemoryMasterKeyBackupService`: wraps Shamir splitting with
//! envelope-encrypted whole-key exports and threshold recovery.

use crate::model::{BackupShare, MasterKeyBackup, ReconstructResult, VerifyBackupResult};
use chrono::{DateTime, Duration, Utc};
use compliance_crypto::{hash::hash_blake3_hex, shamir, EncryptionProvider, KeyMaterialSource};
use compliance_types::{
    ComplianceError, EncryptionContext, KeyManagementProvider, MasterKeyBackupErrorCode, Result,
};
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

const DEFAULT_BACKUP_EXPIRY: Duration = Duration::days(90);
const DEFAULT_SHARE_EXPIRY: Duration = Duration::days(365);

#[derive(Clone, Debug, Default)]
pub struct ExportOptions {
    pub expires_in: Option<Duration>,
}

#[derive(Clone, Debug, Default)]
pub struct SplitOptions {
    pub share_expires_in: Option<Duration>,
    pub custodian_ids: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default)]
pub struct ReconstructOptions {
    pub now: Option<DateTime<Utc>>,
}

pub struct InMemoryMasterKeyBackupService {
    key_management: Arc<dyn KeyManagementProvider>,
    key_source: Arc<dyn KeyMaterialSource>,
    encryption: Arc<dyn EncryptionProvider>,
    backups: DashMap<Uuid, MasterKeyBackup>,
}

impl InMemoryMasterKeyBackupService {
    pub fn new(
        key_management: Arc<dyn KeyManagementProvider>,
        key_source: Arc<dyn KeyMaterialSource>,
        encryption: Arc<dyn EncryptionProvider>,
    ) -> Self {
        Self {
            key_management,
            key_source,
            encryption,
            backups: DashMap::new(),
        }
    }

    pub async fn export_master_key(&self, key_id: &str, options: Option<ExportOptions>) -> Result<MasterKeyBackup> {
        let options = options.unwrap_or_default();
        let metadata = self.key_management.get_key(key_id).await?;
        let resolved = self.key_source.material_for(key_id, metadata.version).await?;

        let ctx = EncryptionContext {
            purpose: Some("master-key-backup".to_string()),
            ..Default::default()
        };
        let encrypted_key_material = self.encryption.encrypt(&resolved.material, &ctx).await?;
        let key_hash = hash_blake3_hex(&resolved.material);

        let now = Utc::now();
        let backup = MasterKeyBackup {
            backup_id: Uuid::new_v4(),
            key_id: key_id.to_string(),
            key_version: metadata.version,
            encrypted_key_material,
            key_hash,
            created_at: now,
            expires_at: Some(now + options.expires_in.unwrap_or(DEFAULT_BACKUP_EXPIRY)),
            format_version: 1,
        };
        self.backups.insert(backup.backup_id, backup.clone());
        Ok(backup)
    }

    pub async fn generate_recovery_split(
        &self,
        key_id: &str,
        total: u8,
        threshold: u8,
        options: Option<SplitOptions>,
    ) -> Result<Vec<BackupShare>> {
        let options = options.unwrap_or_default();
        let metadata = self
            .key_management
            .get_key(key_id)
            .await
            .map_err(|_| ComplianceError::backup(MasterKeyBackupErrorCode::KeyNotFound, key_id.to_string()))?;
        let resolved = self
            .key_source
            .material_for(key_id, metadata.version)
            .await
            .map_err(|_| ComplianceError::backup(MasterKeyBackupErrorCode::KeyNotFound, key_id.to_string()))?;

        if let Some(custodians) = &options.custodian_ids {
            if custodians.len() != total as usize {
                return Err(ComplianceError::configuration(format!(
                    "custodian_ids length {} must equal total_shares {total}",
                    custodians.len()
                )));
            }
        }

        let raw_shares = shamir::split(&resolved.material, total, threshold)?;
        let key_hash = hash_blake3_hex(&resolved.material);
        let now = Utc::now();
        let expires_at = Some(now + options.share_expires_in.unwrap_or(DEFAULT_SHARE_EXPIRY));

        Ok(raw_shares
            .into_iter()
            .enumerate()
            .map(|(i, share_data)| BackupShare {
                share_id: Uuid::new_v4(),
                key_id: key_id.to_string(),
                key_version: metadata.version,
                share_index: shamir::share_index(&share_data).unwrap_or((i + 1) as u8),
                total_shares: total,
                threshold,
                share_data,
                key_hash: key_hash.clone(),
                created_at: now,
                expires_at,
                custodian_id: options.custodian_ids.as_ref().map(|c| c[i].clone()),
            })
            .collect())
    }

    pub fn reconstruct_from_shares(
        &self,
        shares: &[BackupShare],
        options: Option<ReconstructOptions>,
    ) -> Result<ReconstructResult> {
        if shares.is_empty() {
            return Err(ComplianceError::backup(
                MasterKeyBackupErrorCode::InsufficientShares,
                "no shares supplied".to_string(),
            ));
        }
        let first = &shares[0];
        if shares
            .iter()
            .any(|s| s.key_id != first.key_id || s.key_version != first.key_version || s.threshold != first.threshold)
        {
            return Err(ComplianceError::backup(
                MasterKeyBackupErrorCode::ShareMismatch,
                "shares disagree on key_id/key_version/threshold".to_string(),
            ));
        }
        if shares.len() < first.threshold as usize {
            return Err(ComplianceError::backup(
                MasterKeyBackupErrorCode::InsufficientShares,
                format!("need at least {} shares, got {}", first.threshold, shares.len()),
            ));
        }
        let now = options.and_then(|o| o.now).unwrap_or_else(Utc::now);
        if shares.iter().any(|s| s.expires_at.map(|exp| exp < now).unwrap_or(false)) {
            return Err(ComplianceError::backup(
                MasterKeyBackupErrorCode::BackupExpired,
                "one or more shares have expired".to_string(),
            ));
        }

        let raw: Vec<Vec<u8>> = shares.iter().map(|s| s.share_data.clone()).collect();
        shamir::reconstruct(&raw, first.threshold)?;
        Ok(ReconstructResult {
            success: true,
            key_id: first.key_id.clone(),
        })
    }

    /// Merges agreeing shares into a synthetic "combined" share
    /// (`share_index = 0`) for compact distribution. Fails unless all
    /// inputs agree on `key_id`, `key_version`, `threshold`, `total_shares`.
    pub fn combine(shares: &[BackupShare]) -> Result<BackupShare> {
        let first = shares
            .first()
            .ok_or_else(|| ComplianceError::backup(MasterKeyBackupErrorCode::InsufficientShares, "no shares to combine".to_string()))?;
        if shares.iter().any(|s| {
            s.key_id != first.key_id
                || s.key_version != first.key_version
                || s.threshold != first.threshold
                || s.total_shares != first.total_shares
        }) {
            return Err(ComplianceError::backup(
                MasterKeyBackupErrorCode::ShareMismatch,
                "shares disagree on key_id/key_version/threshold/total_shares".to_string(),
            ));
        }
        let share_data = shares.iter().flat_map(|s| s.share_data.clone()).collect();
        Ok(BackupShare {
            share_id: Uuid::new_v4(),
            key_id: first.key_id.clone(),
            key_version: first.key_version,
            share_index: 0,
            total_shares: first.total_shares,
            threshold: first.threshold,
            share_data,
            key_hash: first.key_hash.clone(),
            created_at: Utc::now(),
            expires_at: shares.iter().filter_map(|s| s.expires_at).min(),
            custodian_id: None,
        })
    }

    pub fn verify_backup(&self, backup: &MasterKeyBackup) -> VerifyBackupResult {
        let now = Utc::now();
        let mut result = VerifyBackupResult::default();
        result.is_expired = backup.expires_at.map(|exp| exp < now).unwrap_or(false);
        result.format_supported = MasterKeyBackup::SUPPORTED_FORMAT_VERSIONS.contains(&backup.format_version);
        result.integrity_check_passed = !backup.encrypted_key_material.ciphertext.is_empty();

        if !result.format_supported {
            result.errors.push(format!("unsupported format version {}", backup.format_version));
        }
        if result.is_expired {
            result.errors.push("backup has expired".to_string());
        }
        if !result.integrity_check_passed {
            result.errors.push("encrypted key material is empty".to_string());
        }
        if let Some(expires_at) = backup.expires_at {
            if !result.is_expired && expires_at - now < Duration::days(7) {
                result.warnings.push("backup expires within 7 days".to_string());
            }
        }

        result.is_valid = result.format_supported && result.integrity_check_passed && !result.is_expired;
        result
    }
}
