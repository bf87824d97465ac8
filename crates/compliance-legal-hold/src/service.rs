//! `LegalHoldService`: create/release holds and gate erasure requests
//! against them, plus a background worker that auto-releases holds past
//! their `expires_at`.

use chrono::Utc;
use compliance_types::{ComplianceError, IdType, LegalHold, LegalHoldBasis, LegalHoldStore, Result};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub struct CreateHoldRequest {
    pub data_subject_id_hash: Option<String>,
    pub tenant_id: Option<String>,
    pub basis: LegalHoldBasis,
    pub case_reference: String,
    pub description: String,
    pub created_by: String,
    pub expires_at: Option<chrono::DateTime<Utc>>,
}

pub struct LegalHoldService {
    store: Arc<dyn LegalHoldStore>,
}

impl LegalHoldService {
    pub fn new(store: Arc<dyn LegalHoldStore>) -> Self {
        Self { store }
    }

    pub async fn create_hold(&self, request: CreateHoldRequest) -> Result<LegalHold> {
        if request.case_reference.trim().is_empty() {
            return Err(ComplianceError::configuration("case_reference must not be empty"));
        }
        let hold = LegalHold {
            hold_id: Uuid::new_v4(),
            data_subject_id_hash: request.data_subject_id_hash,
            tenant_id: request.tenant_id,
            basis: request.basis,
            case_reference: request.case_reference,
            description: request.description,
            is_active: true,
            created_by: request.created_by,
            created_at: Utc::now(),
            expires_at: request.expires_at,
            released_by: None,
            released_at: None,
            release_reason: None,
        };
        self.store.save(hold.clone()).await?;
        Ok(hold)
    }

    pub async fn release_hold(&self, hold_id: Uuid, released_by: &str, reason: &str) -> Result<()> {
        self.store.release(hold_id, released_by, reason).await
    }

    /// Returns the first active hold matching the given subject/tenant, if
    /// any.
    pub async fn find_blocking_hold(
        &self,
        data_subject_id_hash: &str,
        id_type: IdType,
        tenant_id: Option<&str>,
    ) -> Result<Option<LegalHold>> {
        let holds = self.store.active_holds_for(data_subject_id_hash, tenant_id).await?;
        Ok(holds.into_iter().find(|h| h.matches(data_subject_id_hash, id_type, tenant_id)))
    }

    /// Spawns the background expiration worker (models it the same
    /// shutdown-channel shape as the multi-region health checker and the
    /// node's own `wait_for_shutdown`). Returns a handle the caller uses
    /// to stop it.
    pub fn spawn_expiration_worker(self: &Arc<Self>, poll_interval: StdDuration) -> ExpirationWorkerHandle {
        let (tx, mut rx) = mpsc::channel::<()>(1);
        let this = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                tokio::select! {
                    _ = rx.recv() => break,
                    _ = ticker.tick() => {
                        if let Err(err) = this.release_expired_holds().await {
                            tracing::warn!(%err, "legal-hold expiration sweep failed");
                        }
                    }
                }
            }
        });
        ExpirationWorkerHandle { shutdown_tx: Some(tx), handle: Some(handle) }
    }

    async fn release_expired_holds(&self) -> Result<()> {
        let expired = self.store.expiring_active_holds(Utc::now()).await?;
        for hold in expired {
            self.store
                .release(hold.hold_id, "system", "hold reached expires_at")
                .await?;
        }
        Ok(())
    }
}

pub struct ExpirationWorkerHandle {
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ExpirationWorkerHandle {
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryLegalHoldStore;

    #[tokio::test]
    async fn blocking_hold_surfaces_case_reference() {
        let store = Arc::new(InMemoryLegalHoldStore::new());
        let service = LegalHoldService::new(store);
        service
            .create_hold(CreateHoldRequest {
                data_subject_id_hash: Some("HASH-U1".to_string()),
                tenant_id: None,
                basis: LegalHoldBasis::LitigationHold,
                case_reference: "CASE-001".to_string(),
                description: "active litigation".to_string(),
                created_by: "legal".to_string(),
                expires_at: None,
            })
            .await
            .unwrap();

        let found = service
            .find_blocking_hold("HASH-U1", IdType::UserId, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.case_reference, "CASE-001");
    }

    #[tokio::test]
    async fn expiration_worker_releases_past_due_holds() {
        let store = Arc::new(InMemoryLegalHoldStore::new());
        let service = Arc::new(LegalHoldService::new(store.clone()));
        let hold = service
            .create_hold(CreateHoldRequest {
                data_subject_id_hash: Some("HASH-U2".to_string()),
                tenant_id: None,
                basis: LegalHoldBasis::AuditRequirement,
                case_reference: "AUDIT-1".to_string(),
                description: "".to_string(),
                created_by: "legal".to_string(),
                expires_at: Some(Utc::now() - chrono::Duration::seconds(1)),
            })
            .await
            .unwrap();

        let worker = service.spawn_expiration_worker(StdDuration::from_millis(20));
        tokio::time::sleep(StdDuration::from_millis(80)).await;
        worker.stop().await;

        let remaining = store.active_holds_for("HASH-U2", None).await.unwrap();
        assert!(remaining.is_empty());
        assert!(store.get(hold.hold_id).await.unwrap().unwrap().released_at.is_some());
    }
}
