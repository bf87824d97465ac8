//! Erasure request/status entities.

use crate::error::{ComplianceError, Result};
use crate::hasher::hash_data_subject_id;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// How the data subject is identified in the originating request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum IdType {
    UserId = 0,
    Email = 1,
    ExternalId = 2,
    NationalId = 3,
    Hash = 4,
    Custom = 99,
}

/// Scope of the requested erasure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErasureScope {
    User,
    Tenant,
    Selective,
}

/// Legal basis for the erasure, naming the GDPR-style grounds this system
/// supports.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegalBasis {
    ConsentWithdrawal,
    RightToObject,
    NoLongerNecessary,
    UnlawfulProcessing,
    LegalObligation,
    Other(String),
}

/// An externally submitted erasure intent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErasureRequest {
    pub request_id: Uuid,
    pub data_subject_id: String,
    pub id_type: IdType,
    pub tenant_id: Option<String>,
    pub scope: ErasureScope,
    pub legal_basis: LegalBasis,
    pub external_reference: Option<String>,
    pub requested_by: String,
    pub requested_at: DateTime<Utc>,
    pub grace_period_override: Option<Duration>,
    pub data_categories: Option<Vec<String>>,
    pub metadata: Option<HashMap<String, String>>,
}

impl ErasureRequest {
    /// Validate the structural invariants: non-empty subject id and
    /// requester, tenant scope requires a tenant id, selective scope
    /// requires non-empty data categories.
    pub fn validate(&self) -> Result<()> {
        if self.data_subject_id.trim().is_empty() {
            return Err(ComplianceError::ErasureValidation(
                "data_subject_id must not be empty".to_string(),
            ));
        }
        if self.requested_by.trim().is_empty() {
            return Err(ComplianceError::ErasureValidation(
                "requested_by must not be empty".to_string(),
            ));
        }
        if self.scope == ErasureScope::Tenant && self.tenant_id.is_none() {
            return Err(ComplianceError::ErasureValidation(
                "scope=Tenant requires tenant_id".to_string(),
            ));
        }
        if self.scope == ErasureScope::Selective
            && self
                .data_categories
                .as_ref()
                .map(|c| c.is_empty())
                .unwrap_or(true)
        {
            return Err(ComplianceError::ErasureValidation(
                "scope=Selective requires non-empty data_categories".to_string(),
            ));
        }
        Ok(())
    }

    pub fn data_subject_id_hash(&self) -> String {
        hash_data_subject_id(&self.data_subject_id)
    }
}

/// Persisted lifecycle of a request. Integer tags are stable for
/// persistence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ErasureStatusKind {
    Pending = 0,
    Scheduled = 1,
    InProgress = 2,
    Completed = 3,
    BlockedByLegalHold = 4,
    Cancelled = 5,
    Failed = 6,
    PartiallyCompleted = 7,
}

impl ErasureStatusKind {
    pub fn can_cancel(&self) -> bool {
        matches!(self, ErasureStatusKind::Pending | ErasureStatusKind::Scheduled)
    }

    pub fn is_executed(&self) -> bool {
        matches!(
            self,
            ErasureStatusKind::Completed | ErasureStatusKind::PartiallyCompleted
        )
    }
}

/// The full persisted status record for a request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErasureStatus {
    pub request_id: Uuid,
    pub status: ErasureStatusKind,
    pub data_subject_id_hash: String,
    pub requested_at: DateTime<Utc>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub execution_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub keys_deleted: u32,
    pub records_affected: u64,
    pub certificate_id: Option<Uuid>,
    pub blocking_hold_id: Option<Uuid>,
    pub failure_reason: Option<String>,
}

impl ErasureStatus {
    pub fn can_cancel(&self) -> bool {
        self.status.can_cancel()
    }

    pub fn is_executed(&self) -> bool {
        self.status.is_executed()
    }

    /// `max(0, (requested_at + 30d) - now)` in whole days.
    pub fn days_until_deadline(&self, now: DateTime<Utc>) -> i64 {
        let deadline = self.requested_at + Duration::days(30);
        let remaining = deadline - now;
        remaining.num_days().max(0)
    }
}
