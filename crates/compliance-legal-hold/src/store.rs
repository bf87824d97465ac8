//! In-memory `LegalHoldStore` reference implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use compliance_types::{ComplianceError, IdType, LegalHold, LegalHoldStore, Result};
use dashmap::DashMap;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryLegalHoldStore {
    holds: DashMap<Uuid, LegalHold>,
}

impl InMemoryLegalHoldStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LegalHoldStore for InMemoryLegalHoldStore {
    async fn save(&self, hold: LegalHold) -> Result<()> {
        self.holds.insert(hold.hold_id, hold);
        Ok(())
    }

    async fn get(&self, hold_id: Uuid) -> Result<Option<LegalHold>> {
        Ok(self.holds.get(&hold_id).map(|h| h.clone()))
    }

    async fn release(&self, hold_id: Uuid, released_by: &str, reason: &str) -> Result<()> {
        let mut hold = self
            .holds
            .get_mut(&hold_id)
            .ok_or_else(|| ComplianceError::invariant(format!("legal hold {hold_id} not found")))?;
        hold.is_active = false;
        hold.released_by = Some(released_by.to_string());
        hold.released_at = Some(Utc::now());
        hold.release_reason = Some(reason.to_string());
        Ok(())
    }

    async fn active_holds_for(&self, data_subject_id_hash: &str, tenant_id: Option<&str>) -> Result<Vec<LegalHold>> {
        Ok(self
            .holds
            .iter()
            .map(|e| e.value().clone())
            .filter(|h| h.matches(data_subject_id_hash, IdType::Hash, tenant_id))
            .collect())
    }

    async fn expiring_active_holds(&self, as_of: DateTime<Utc>) -> Result<Vec<LegalHold>> {
        Ok(self
            .holds
            .iter()
            .map(|e| e.value().clone())
            .filter(|h| h.is_active && h.expires_at.map(|exp| exp <= as_of).unwrap_or(false))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compliance_types::LegalHoldBasis;

    fn hold(hash: Option<&str>, tenant: Option<&str>) -> LegalHold {
        LegalHold {
            hold_id: Uuid::new_v4(),
            data_subject_id_hash: hash.map(|s| s.to_string()),
            tenant_id: tenant.map(|s| s.to_string()),
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

    #[tokio::test]
    async fn save_then_lookup_active_holds() {
        let store = InMemoryLegalHoldStore::new();
        store.save(hold(Some("HASH-1"), None)).await.unwrap();
        let found = store.active_holds_for("HASH-1", None).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn release_deactivates_hold() {
        let store = InMemoryLegalHoldStore::new();
        let h = hold(Some("HASH-1"), None);
        let id = h.hold_id;
        store.save(h).await.unwrap();
        store.release(id, "legal-admin", "litigation closed").await.unwrap();
        let found = store.active_holds_for("HASH-1", None).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn expiring_active_holds_filters_by_deadline() {
        let store = InMemoryLegalHoldStore::new();
        let mut h = hold(Some("HASH-1"), None);
        h.expires_at = Some(Utc::now() - chrono::Duration::hours(1));
        store.save(h).await.unwrap();
        let expiring = store.expiring_active_holds(Utc::now()).await.unwrap();
        assert_eq!(expiring.len(), 1);
    }
}
