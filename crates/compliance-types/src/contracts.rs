//! Store and provider contracts consumed by the core.
//!
//! These are the seams the embedding application's persistence and KMS
//! layers plug into. The library only ever talks to these traits; it never
//! assumes a concrete backend. Capability lookups that could be modeled
//! as a dynamic `get_service(type)` are expressed here as typed optional
//! accessors (`query_store`/`certificate_store`) rather than a stringly-typed
//! lookup, since Rust's trait objects make that the more idiomatic shape.

use crate::certificate::{AuditEvent, AuditFilter, ErasureCertificate};
use crate::erasure::{ErasureRequest, ErasureStatus, ErasureStatusKind};
use crate::error::Result;
use crate::inventory::{DataInventory, FieldRegistration};
use crate::key::{EncryptionAlgorithm, KeyMetadata, KeyStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Pagination/filter parameters for `ErasureQueryStore::list_requests`.
#[derive(Clone, Debug, Default)]
pub struct ErasureListFilter {
    pub status: Option<ErasureStatusKind>,
    pub tenant_id: Option<String>,
    pub offset: usize,
    pub limit: usize,
}

/// Source of truth for key lifecycle: creation, rotation, lookup, deletion.
/// Implemented by a concrete KMS-backed or in-memory provider.
#[async_trait]
pub trait KeyManagementProvider: Send + Sync {
    async fn get_key(&self, key_id: &str) -> Result<KeyMetadata>;
    async fn get_active_key(&self, purpose: Option<&str>) -> Result<KeyMetadata>;
    async fn rotate_key(
        &self,
        key_id: &str,
        algorithm: EncryptionAlgorithm,
        purpose: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<KeyMetadata>;
    async fn list_keys(
        &self,
        status: Option<KeyStatus>,
        purpose: Option<&str>,
    ) -> Result<Vec<KeyMetadata>>;
    async fn delete_key(&self, key_id: &str, grace_period_days: u32) -> Result<()>;
    async fn suspend_key(&self, key_id: &str, reason: &str) -> Result<()>;
}

/// Query-side extension a store may optionally support, surfaced through
/// [`ErasureStore::query_store`].
#[async_trait]
pub trait ErasureQueryStore: Send + Sync {
    async fn get_scheduled_requests(&self, max: usize) -> Result<Vec<ErasureStatus>>;
    async fn list_requests(&self, filter: ErasureListFilter) -> Result<Vec<ErasureStatus>>;
}

/// Certificate persistence a store may optionally support, surfaced through
/// [`ErasureStore::certificate_store`].
#[async_trait]
pub trait ErasureCertificateStore: Send + Sync {
    async fn get_certificate(&self, request_id: Uuid) -> Result<Option<ErasureCertificate>>;
    async fn get_certificate_by_id(&self, certificate_id: Uuid) -> Result<Option<ErasureCertificate>>;
    async fn save_certificate(&self, certificate: ErasureCertificate) -> Result<()>;
}

/// Primary erasure-request persistence contract.
#[async_trait]
pub trait ErasureStore: Send + Sync {
    async fn save_request(&self, request: &ErasureRequest, execution_at: DateTime<Utc>) -> Result<ErasureStatus>;
    async fn get_status(&self, request_id: Uuid) -> Result<Option<ErasureStatus>>;

    /// Atomic compare-and-set transition. Returns `true` iff this call
    /// performed the transition (i.e. the prior state matched `from`, when
    /// given).
    async fn update_status(
        &self,
        request_id: Uuid,
        to: ErasureStatusKind,
        from: Option<ErasureStatusKind>,
    ) -> Result<bool>;

    async fn record_completion(
        &self,
        request_id: Uuid,
        keys_deleted: u32,
        records_affected: u64,
        certificate_id: Option<Uuid>,
    ) -> Result<()>;

    async fn record_blocked(&self, request_id: Uuid, hold_id: Uuid) -> Result<()>;
    async fn record_cancellation(&self, request_id: Uuid) -> Result<()>;
    async fn record_failure(&self, request_id: Uuid, reason: &str) -> Result<()>;

    fn query_store(&self) -> Option<&dyn ErasureQueryStore> {
        None
    }

    fn certificate_store(&self) -> Option<&dyn ErasureCertificateStore> {
        None
    }
}

/// A collaborator that holds non-encrypted residue of a subject's data and
/// must participate in crypto-erasure fan-out.
#[async_trait]
pub trait ErasureContributor: Send + Sync {
    fn name(&self) -> &str;
    async fn erase(&self, context: &ContributorContext) -> Result<ContributorResult>;
}

/// Context handed to each contributor during fan-out.
#[derive(Clone, Debug)]
pub struct ContributorContext {
    pub request_id: Uuid,
    pub data_subject_id_hash: String,
    pub tenant_id: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ContributorResult {
    pub success: bool,
    pub records_affected: u64,
    pub message: Option<String>,
}

/// Legal-hold backend contract.
#[async_trait]
pub trait LegalHoldStore: Send + Sync {
    async fn save(&self, hold: crate::legal_hold::LegalHold) -> Result<()>;
    async fn get(&self, hold_id: Uuid) -> Result<Option<crate::legal_hold::LegalHold>>;
    async fn release(&self, hold_id: Uuid, released_by: &str, reason: &str) -> Result<()>;
    async fn active_holds_for(
        &self,
        data_subject_id_hash: &str,
        tenant_id: Option<&str>,
    ) -> Result<Vec<crate::legal_hold::LegalHold>>;
    async fn expiring_active_holds(&self, as_of: DateTime<Utc>) -> Result<Vec<crate::legal_hold::LegalHold>>;
}

/// Data-inventory backend contract.
#[async_trait]
pub trait DataInventoryStore: Send + Sync {
    async fn register(&self, registration: FieldRegistration) -> Result<()>;
    async fn unregister(&self, table_name: &str, field_name: &str) -> Result<bool>;
    async fn registrations_for(
        &self,
        id_type_hint: Option<&str>,
        tenant_id: Option<&str>,
    ) -> Result<Vec<FieldRegistration>>;
    async fn discovered_locations(&self, data_subject_id_hash: &str) -> Result<Vec<crate::inventory::DataLocation>>;
    async fn record_discovery(&self, inventory: DataInventory) -> Result<()>;
    fn registration_count(&self) -> usize;
    fn data_subject_count(&self) -> usize;
}

/// Audit-trail read contract; writes happen through whatever structured
/// event sink the embedding application wires in (out of scope here).
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn query(&self, filter: AuditFilter) -> Result<Vec<AuditEvent>>;
}

/// Relationship resolver for cascade erasure: given a subject,
/// returns the subjects directly related to it (e.g. shared household,
/// linked accounts).
#[async_trait]
pub trait CascadeRelationshipResolver: Send + Sync {
    async fn get_related_subjects(&self, data_subject_id: &str) -> Result<Vec<String>>;
}

/// Backing store a producer stages outbound message payloads into. The
/// encrypting decorator wraps this and is the only thing that ever
/// sees plaintext on the write side.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    async fn stage(&self, key: &str, payload: Vec<u8>) -> Result<()>;
}

/// Backing store a consumer reads inbound message payloads from. Mirrors
/// `OutboxStore` on the read side; `write_back` exists only so the
/// encrypting decorator can persist an opportunistically re-encrypted
/// payload during lazy migration — it is never called for anything
/// else.
#[async_trait]
pub trait InboxStore: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn write_back(&self, key: &str, payload: Vec<u8>) -> Result<()>;
}
