//! Legal hold entities: retention overrides that block erasure.

use crate::erasure::IdType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Basis for a legal hold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegalHoldBasis {
    LitigationHold,
    RegulatoryInvestigation,
    AuditRequirement,
    Other(String),
}

/// A retention override blocking erasure for matched subjects/tenants.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LegalHold {
    pub hold_id: Uuid,
    pub data_subject_id_hash: Option<String>,
    pub tenant_id: Option<String>,
    pub basis: LegalHoldBasis,
    pub case_reference: String,
    pub description: String,
    pub is_active: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub released_by: Option<String>,
    pub released_at: Option<DateTime<Utc>>,
    pub release_reason: Option<String>,
}

impl LegalHold {
    /// A request matches a hold when either the subject hash matches, or
    /// the tenant matches while the hold is subject-agnostic.
    pub fn matches(
        &self,
        data_subject_id_hash: &str,
        _id_type: IdType,
        tenant_id: Option<&str>,
    ) -> bool {
        if !self.is_active {
            return false;
        }
        if let Some(hold_subject) = &self.data_subject_id_hash {
            if hold_subject == data_subject_id_hash {
                return true;
            }
        } else if let Some(hold_tenant) = &self.tenant_id {
            if Some(hold_tenant.as_str()) == tenant_id {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_hold() -> LegalHold {
        LegalHold {
            hold_id: Uuid::new_v4(),
            data_subject_id_hash: None,
            tenant_id: None,
            basis: LegalHoldBasis::LitigationHold,
            case_reference: "CASE-001".to_string(),
            description: "desc".to_string(),
            is_active: true,
            created_by: "legal".to_string(),
            created_at: Utc::now(),
            expires_at: None,
            released_by: None,
            released_at: None,
            release_reason: None,
        }
    }

    #[test]
    fn matches_by_subject_hash() {
        let mut hold = base_hold();
        hold.data_subject_id_hash = Some("HASH".to_string());
        assert!(hold.matches("HASH", IdType::UserId, None));
        assert!(!hold.matches("OTHER", IdType::UserId, None));
    }

    #[test]
    fn matches_by_tenant_when_subject_agnostic() {
        let mut hold = base_hold();
        hold.tenant_id = Some("tenant-a".to_string());
        assert!(hold.matches("any-hash", IdType::UserId, Some("tenant-a")));
        assert!(!hold.matches("any-hash", IdType::UserId, Some("tenant-b")));
    }

    #[test]
    fn inactive_hold_never_matches() {
        let mut hold = base_hold();
        hold.data_subject_id_hash = Some("HASH".to_string());
        hold.is_active = false;
        assert!(!hold.matches("HASH", IdType::UserId, None));
    }
}
