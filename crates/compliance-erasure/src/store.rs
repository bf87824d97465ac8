//! In-memory `ErasureStore` reference implementation, with the
//! query-store and certificate-store capabilities both surfaced through
//! the same backing object.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use compliance_types::{
    ComplianceError, ErasureCertificate, ErasureCertificateStore, ErasureListFilter, ErasureQueryStore, ErasureRequest,
    ErasureStatus, ErasureStatusKind, ErasureStore, Result,
};
use dashmap::DashMap;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryErasureStore {
    statuses: DashMap<Uuid, ErasureStatus>,
    certificates: DashMap<Uuid, ErasureCertificate>,
}

impl InMemoryErasureStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ErasureStore for InMemoryErasureStore {
    async fn save_request(&self, request: &ErasureRequest, execution_at: DateTime<Utc>) -> Result<ErasureStatus> {
        let status = ErasureStatus {
            request_id: request.request_id,
            status: ErasureStatusKind::Scheduled,
            data_subject_id_hash: request.data_subject_id_hash(),
            requested_at: request.requested_at,
            scheduled_at: Some(Utc::now()),
            execution_at: Some(execution_at),
            completed_at: None,
            keys_deleted: 0,
            records_affected: 0,
            certificate_id: None,
            blocking_hold_id: None,
            failure_reason: None,
        };
        self.statuses.insert(request.request_id, status.clone());
        Ok(status)
    }

    async fn get_status(&self, request_id: Uuid) -> Result<Option<ErasureStatus>> {
        Ok(self.statuses.get(&request_id).map(|e| e.clone()))
    }

    async fn update_status(
        &self,
        request_id: Uuid,
        to: ErasureStatusKind,
        from: Option<ErasureStatusKind>,
    ) -> Result<bool> {
        let Some(mut entry) = self.statuses.get_mut(&request_id) else {
            return Ok(false);
        };
        if let Some(expected) = from {
            if entry.status != expected {
                return Ok(false);
            }
        }
        entry.status = to;
        Ok(true)
    }

    async fn record_completion(
        &self,
        request_id: Uuid,
        keys_deleted: u32,
        records_affected: u64,
        certificate_id: Option<Uuid>,
    ) -> Result<()> {
        let mut entry = self
            .statuses
            .get_mut(&request_id)
            .ok_or_else(|| ComplianceError::invariant(format!("erasure request {request_id} not found")))?;
        entry.status = ErasureStatusKind::Completed;
        entry.keys_deleted = keys_deleted;
        entry.records_affected = records_affected;
        entry.certificate_id = certificate_id;
        entry.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn record_blocked(&self, request_id: Uuid, hold_id: Uuid) -> Result<()> {
        let mut entry = self
            .statuses
            .get_mut(&request_id)
            .ok_or_else(|| ComplianceError::invariant(format!("erasure request {request_id} not found")))?;
        entry.status = ErasureStatusKind::BlockedByLegalHold;
        entry.blocking_hold_id = Some(hold_id);
        Ok(())
    }

    async fn record_cancellation(&self, request_id: Uuid) -> Result<()> {
        let mut entry = self
            .statuses
            .get_mut(&request_id)
            .ok_or_else(|| ComplianceError::invariant(format!("erasure request {request_id} not found")))?;
        if !entry.can_cancel() {
            return Err(ComplianceError::StateTransition(format!(
                "request {request_id} cannot be cancelled from {:?}",
                entry.status
            )));
        }
        entry.status = ErasureStatusKind::Cancelled;
        Ok(())
    }

    async fn record_failure(&self, request_id: Uuid, reason: &str) -> Result<()> {
        let mut entry = self
            .statuses
            .get_mut(&request_id)
            .ok_or_else(|| ComplianceError::invariant(format!("erasure request {request_id} not found")))?;
        entry.status = ErasureStatusKind::Failed;
        entry.failure_reason = Some(reason.to_string());
        Ok(())
    }

    fn query_store(&self) -> Option<&dyn ErasureQueryStore> {
        Some(self)
    }

    fn certificate_store(&self) -> Option<&dyn ErasureCertificateStore> {
        Some(self)
    }
}

#[async_trait]
impl ErasureQueryStore for InMemoryErasureStore {
    async fn get_scheduled_requests(&self, max: usize) -> Result<Vec<ErasureStatus>> {
        let now = Utc::now();
        let mut due: Vec<ErasureStatus> = self
            .statuses
            .iter()
            .map(|e| e.value().clone())
            .filter(|s| s.status == ErasureStatusKind::Scheduled && s.execution_at.map(|at| at <= now).unwrap_or(true))
            .collect();
        due.sort_by_key(|s| s.execution_at);
        due.truncate(max);
        Ok(due)
    }

    async fn list_requests(&self, filter: ErasureListFilter) -> Result<Vec<ErasureStatus>> {
        let mut matches: Vec<ErasureStatus> = self
            .statuses
            .iter()
            .map(|e| e.value().clone())
            .filter(|s| filter.status.map(|st| st == s.status).unwrap_or(true))
            .collect();
        matches.sort_by_key(|s| s.requested_at);
        let limit = if filter.limit == 0 { matches.len() } else { filter.limit };
        Ok(matches.into_iter().skip(filter.offset).take(limit).collect())
    }
}

#[async_trait]
impl ErasureCertificateStore for InMemoryErasureStore {
    async fn get_certificate(&self, request_id: Uuid) -> Result<Option<ErasureCertificate>> {
        Ok(self.certificates.iter().find(|e| e.request_id == request_id).map(|e| e.value().clone()))
    }

    async fn get_certificate_by_id(&self, certificate_id: Uuid) -> Result<Option<ErasureCertificate>> {
        Ok(self.certificates.get(&certificate_id).map(|e| e.clone()))
    }

    async fn save_certificate(&self, certificate: ErasureCertificate) -> Result<()> {
        self.certificates.insert(certificate.certificate_id, certificate);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compliance_types::{ErasureScope, IdType, LegalBasis};

    fn request() -> ErasureRequest {
        ErasureRequest {
            request_id: Uuid::new_v4(),
            data_subject_id: "user-1".to_string(),
            id_type: IdType::UserId,
            tenant_id: None,
            scope: ErasureScope::User,
            legal_basis: LegalBasis::ConsentWithdrawal,
            external_reference: None,
            requested_by: "admin".to_string(),
            requested_at: Utc::now(),
            grace_period_override: None,
            data_categories: None,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn save_then_get_status_round_trips() {
        let store = InMemoryErasureStore::new();
        let req = request();
        store.save_request(&req, Utc::now()).await.unwrap();
        let status = store.get_status(req.request_id).await.unwrap().unwrap();
        assert_eq!(status.status, ErasureStatusKind::Scheduled);
    }

    #[tokio::test]
    async fn concurrent_cas_only_one_winner() {
        let store = std::sync::Arc::new(InMemoryErasureStore::new());
        let req = request();
        store.save_request(&req, Utc::now()).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let id = req.request_id;
            handles.push(tokio::spawn(async move {
                store
                    .update_status(id, ErasureStatusKind::InProgress, Some(ErasureStatusKind::Scheduled))
                    .await
                    .unwrap()
            }));
        }
        let mut wins = 0;
        for h in handles {
            if h.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }
}
