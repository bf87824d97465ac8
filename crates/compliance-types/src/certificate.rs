//! Erasure certificates and audit events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Method used to execute the erasure, recorded on the certificate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErasureMethod {
    CryptographicErasure,
    PhysicalDeletion,
    Anonymization,
}

impl Default for ErasureMethod {
    fn default() -> Self {
        ErasureMethod::CryptographicErasure
    }
}

/// Independent method a verification pass can use to re-prove erasure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationMethod {
    KeyDeletionConfirmed,
    DecryptionAttemptFails,
    StoreScanClean,
    AuditTrailConsistent,
}

/// Counts the certificate reports for the erasure it attests.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CertificateSummary {
    pub keys_deleted: u32,
    pub records_affected: u64,
    pub contributors_invoked: u32,
}

/// A signed, tamper-evident receipt that an erasure was executed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErasureCertificate {
    pub certificate_id: Uuid,
    pub request_id: Uuid,
    pub data_subject_reference: String,
    pub request_received_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub method: ErasureMethod,
    pub summary: CertificateSummary,
    pub verification: Vec<VerificationMethod>,
    pub legal_basis: String,
    pub exceptions: Vec<String>,
    pub signature: String,
    pub retain_until: DateTime<Utc>,
    pub format_version: String,
    pub generated_at: DateTime<Utc>,
}

impl ErasureCertificate {
    pub const FORMAT_VERSION: &'static str = "1.0";

    /// Deterministic signing input: canonical concatenation of every
    /// header field, ordered the same way every time.
    pub fn canonical_signing_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(self.certificate_id.as_bytes());
        buf.extend_from_slice(self.request_id.as_bytes());
        buf.extend_from_slice(self.data_subject_reference.as_bytes());
        buf.extend_from_slice(self.completed_at.to_rfc3339().as_bytes());
        buf.extend_from_slice(&[self.method as i32 as u8]);
        buf.extend_from_slice(self.legal_basis.as_bytes());
        buf.extend_from_slice(&self.summary.keys_deleted.to_be_bytes());
        buf.extend_from_slice(&self.summary.records_affected.to_be_bytes());
        buf.extend_from_slice(&self.summary.contributors_invoked.to_be_bytes());
        buf
    }
}

/// Kind of audit event recorded for compliance actions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditEventKind {
    ErasureRequested,
    ErasureScheduled,
    ErasureBlocked,
    ErasureExecuted,
    ErasureFailed,
    CertificateGenerated,
    LegalHoldCreated,
    LegalHoldReleased,
    KeyRotated,
    KeyDeleted,
}

/// A single audit-trail entry, readable through `IAuditStore::query`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub subject_hash: Option<String>,
    pub kind: AuditEventKind,
    pub detail: String,
}

/// Filter accepted by `IAuditStore::query`.
#[derive(Clone, Debug, Default)]
pub struct AuditFilter {
    pub subject_hash: Option<String>,
    pub kind: Option<AuditEventKind>,
    pub since: Option<DateTime<Utc>>,
}
