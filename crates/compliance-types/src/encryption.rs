//! The at-rest/wire envelope and the per-operation encryption context.

use crate::key::EncryptionAlgorithm;
use serde::{Deserialize, Serialize};

/// Leading 4-byte magic identifying encrypted payloads to decorators: the
/// ASCII bytes `EXCR`.
pub const MAGIC: [u8; 4] = [0x45, 0x58, 0x43, 0x52];

/// `ciphertext, iv, auth_tag?, key_id, key_version, algorithm, tenant_id?` —
/// the at-rest/wire envelope for encrypted data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedData {
    pub ciphertext: Vec<u8>,
    pub iv: Vec<u8>,
    pub auth_tag: Option<Vec<u8>>,
    pub key_id: String,
    pub key_version: u32,
    pub algorithm: EncryptionAlgorithm,
    pub tenant_id: Option<String>,
}

impl EncryptedData {
    /// Serialize with the leading magic prefix, the at-rest wire format.
    pub fn to_wire(&self) -> Vec<u8> {
        let body = serde_json::to_vec(self).unwrap_or_default();
        let mut out = Vec::with_capacity(MAGIC.len() + body.len());
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&body);
        out
    }

    /// Parse a wire-format buffer back into an envelope, checking the magic
    /// prefix first.
    pub fn from_wire(buf: &[u8]) -> Option<Self> {
        if !is_field_encrypted(buf) {
            return None;
        }
        serde_json::from_slice(&buf[MAGIC.len()..]).ok()
    }
}

/// `true` iff `len(buf) >= 4 && buf[0..4] == MAGIC`.
pub fn is_field_encrypted(buf: &[u8]) -> bool {
    buf.len() >= MAGIC.len() && buf[..MAGIC.len()] == MAGIC
}

/// Per-operation metadata threaded through encrypt/decrypt calls. Equality
/// is structural.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionContext {
    pub key_id: Option<String>,
    pub key_version: Option<u32>,
    pub algorithm: Option<EncryptionAlgorithm>,
    pub tenant_id: Option<String>,
    pub purpose: Option<String>,
    pub associated_data: Option<Vec<u8>>,
    pub classification: Option<String>,
    pub require_fips_compliance: bool,
}

impl EncryptionContext {
    /// Convenience constructor scoping a context to a tenant.
    pub fn for_tenant(id: impl Into<String>) -> Self {
        Self {
            tenant_id: Some(id.into()),
            ..Default::default()
        }
    }
}
