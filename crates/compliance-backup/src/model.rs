//! Master-key backup entities. Scoped to this crate rather than
//! `compliance-types` since no other subsystem consumes them.

use chrono::{DateTime, Utc};
use compliance_types::EncryptedData;
use uuid::Uuid;

/// One Shamir piece of a master key.
#[derive(Clone, Debug)]
pub struct BackupShare {
    pub share_id: Uuid,
    pub key_id: String,
    pub key_version: u32,
    pub share_index: u8,
    pub total_shares: u8,
    pub threshold: u8,
    pub share_data: Vec<u8>,
    pub key_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub custodian_id: Option<String>,
}

/// A wrapped export of a master key's raw material.
#[derive(Clone, Debug)]
pub struct MasterKeyBackup {
    pub backup_id: Uuid,
    pub key_id: String,
    pub key_version: u32,
    pub encrypted_key_material: EncryptedData,
    pub key_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub format_version: u32,
}

impl MasterKeyBackup {
    pub const SUPPORTED_FORMAT_VERSIONS: [u32; 1] = [1];
}

#[derive(Clone, Debug, Default)]
pub struct VerifyBackupResult {
    pub is_valid: bool,
    pub is_expired: bool,
    pub format_supported: bool,
    pub integrity_check_passed: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct ReconstructResult {
    pub success: bool,
    pub key_id: String,
}
