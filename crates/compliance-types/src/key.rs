//! Key metadata and the algorithms/scopes it carries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Supported envelope-encryption algorithms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncryptionAlgorithm {
    Aes256Gcm,
    Aes256CbcHmac,
}

impl EncryptionAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncryptionAlgorithm::Aes256Gcm => "AES-256-GCM",
            EncryptionAlgorithm::Aes256CbcHmac => "AES-256-CBC-HMAC",
        }
    }
}

/// Lifecycle state of a key. Integer tags are stable for persistence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum KeyStatus {
    Active = 0,
    DecryptOnly = 1,
    PendingDestruction = 2,
    Destroyed = 3,
    Suspended = 4,
}

/// Logical scope a key's purpose maps to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyScope {
    User,
    Tenant,
    Field,
}

/// Derive a [`KeyScope`] from a key's free-text `purpose`, case-insensitive
/// token match: USER/DEK -> User, TENANT/KEK -> Tenant, FIELD -> Field, else
/// User.
pub fn scope_from_purpose(purpose: Option<&str>) -> KeyScope {
    let Some(purpose) = purpose else {
        return KeyScope::User;
    };
    let upper = purpose.to_ascii_uppercase();
    if upper.contains("TENANT") || upper.contains("KEK") {
        KeyScope::Tenant
    } else if upper.contains("FIELD") {
        KeyScope::Field
    } else {
        // Covers "USER"/"DEK" and any other unrecognized token.
        KeyScope::User
    }
}

/// Identity and lifecycle of a symmetric or wrapping key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyMetadata {
    pub key_id: String,
    pub version: u32,
    pub algorithm: EncryptionAlgorithm,
    pub status: KeyStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_rotated_at: Option<DateTime<Utc>>,
    pub purpose: Option<String>,
    pub is_fips_compliant: bool,
}

impl KeyMetadata {
    pub fn scope(&self) -> KeyScope {
        scope_from_purpose(self.purpose.as_deref())
    }
}
