//! Concrete probes against each compliance-runtime collaborator named in
//! dependency order: key management, multi-region
//! replication, the erasure store's scheduled backlog, legal holds, and
//! data inventory.

use crate::check::{CheckResult, HealthCheck};
use async_trait::async_trait;
use compliance_keys::MultiRegionKeyProvider;
use compliance_types::{DataInventoryStore, ErasureStore, KeyManagementProvider, LegalHoldStore};
use std::sync::Arc;
use std::time::Instant;

/// Probes `KeyManagementProvider::list_keys` — the same call the
/// multi-region health-check loop uses internally, reused here as
/// the generic liveness probe for any key-management backend.
pub struct KeyManagementHealthCheck {
    provider: Arc<dyn KeyManagementProvider>,
}

impl KeyManagementHealthCheck {
    pub fn new(provider: Arc<dyn KeyManagementProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl HealthCheck for KeyManagementHealthCheck {
    fn name(&self) -> &str {
        "key_management"
    }

    async fn check(&self) -> CheckResult {
        let start = Instant::now();
        match self.provider.list_keys(None, None).await {
            Ok(_) => CheckResult::healthy(self.name(), start.elapsed()),
            Err(err) => CheckResult::unhealthy(self.name(), start.elapsed(), err.to_string()),
        }
    }
}

/// Reports `Degraded` while a [`MultiRegionKeyProvider`] is operating out
/// of its primary region — the active provider is still answering, so this
/// is never `Unhealthy` by itself; it surfaces the failover as an
/// operational signal rather than a collaborator failure.
pub struct ReplicationHealthCheck {
    provider: Arc<MultiRegionKeyProvider>,
}

impl ReplicationHealthCheck {
    pub fn new(provider: Arc<MultiRegionKeyProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl HealthCheck for ReplicationHealthCheck {
    fn name(&self) -> &str {
        "key_replication"
    }

    async fn check(&self) -> CheckResult {
        let start = Instant::now();
        let status = self.provider.get_replication_status().await;
        if status.in_failover {
            CheckResult::degraded(
                self.name(),
                start.elapsed(),
                format!("operating on failover region '{}'", status.active_region_id),
            )
        } else {
            CheckResult::healthy(self.name(), start.elapsed())
        }
    }
}

/// Flags a growing scheduled-erasure backlog as `Degraded`; a store without
/// the `ErasureQueryStore` capability is reported `Unhealthy` since the
/// scheduler worker cannot function without it.
pub struct ErasureBacklogHealthCheck {
    store: Arc<dyn ErasureStore>,
    degraded_threshold: usize,
}

impl ErasureBacklogHealthCheck {
    pub fn new(store: Arc<dyn ErasureStore>, degraded_threshold: usize) -> Self {
        Self { store, degraded_threshold }
    }
}

#[async_trait]
impl HealthCheck for ErasureBacklogHealthCheck {
    fn name(&self) -> &str {
        "erasure_backlog"
    }

    async fn check(&self) -> CheckResult {
        let start = Instant::now();
        let Some(query) = self.store.query_store() else {
            return CheckResult::unhealthy(self.name(), start.elapsed(), "store exposes no query-store capability");
        };
        // probe one more than the threshold so we can tell "at the
        // threshold" from "over it" without counting the whole backlog.
        match query.get_scheduled_requests(self.degraded_threshold + 1).await {
            Ok(due) if due.len() > self.degraded_threshold => CheckResult::degraded(
                self.name(),
                start.elapsed(),
                format!("scheduled backlog exceeds {} requests", self.degraded_threshold),
            ),
            Ok(_) => CheckResult::healthy(self.name(), start.elapsed()),
            Err(err) => CheckResult::unhealthy(self.name(), start.elapsed(), err.to_string()),
        }
    }
}

/// Probes `LegalHoldStore::expiring_active_holds` as a cheap liveness
/// check — the same query the expiration worker polls on its own cadence.
pub struct LegalHoldHealthCheck {
    store: Arc<dyn LegalHoldStore>,
}

impl LegalHoldHealthCheck {
    pub fn new(store: Arc<dyn LegalHoldStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl HealthCheck for LegalHoldHealthCheck {
    fn name(&self) -> &str {
        "legal_hold_store"
    }

    async fn check(&self) -> CheckResult {
        let start = Instant::now();
        match self.store.expiring_active_holds(chrono::Utc::now()).await {
            Ok(_) => CheckResult::healthy(self.name(), start.elapsed()),
            Err(err) => CheckResult::unhealthy(self.name(), start.elapsed(), err.to_string()),
        }
    }
}

/// Probes `DataInventoryStore::registrations_for` as a cheap liveness
/// check for the discovery backend.
pub struct DataInventoryHealthCheck {
    store: Arc<dyn DataInventoryStore>,
}

impl DataInventoryHealthCheck {
    pub fn new(store: Arc<dyn DataInventoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl HealthCheck for DataInventoryHealthCheck {
    fn name(&self) -> &str {
        "data_inventory_store"
    }

    async fn check(&self) -> CheckResult {
        let start = Instant::now();
        match self.store.registrations_for(None, None).await {
            Ok(_) => CheckResult::healthy(self.name(), start.elapsed()),
            Err(err) => CheckResult::unhealthy(self.name(), start.elapsed(), err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compliance_erasure::InMemoryErasureStore;
    use compliance_inventory::InMemoryDataInventoryStore;
    use compliance_keys::InMemoryKeyManagementProvider;
    use compliance_legal_hold::InMemoryLegalHoldStore;

    #[tokio::test]
    async fn key_management_check_reports_healthy() {
        let provider = Arc::new(InMemoryKeyManagementProvider::new());
        let check = KeyManagementHealthCheck::new(provider);
        let result = check.check().await;
        assert!(result.status.is_healthy());
    }

    #[tokio::test]
    async fn erasure_backlog_reports_degraded_past_threshold() {
        use chrono::{Duration, Utc};
        use compliance_erasure::{ErasureService, ErasureServiceOptions};
        use compliance_metrics::MetricRegistry;
        use compliance_types::{ErasureRequest, ErasureScope, IdType, LegalBasis};

        let store: Arc<dyn compliance_types::ErasureStore> = Arc::new(InMemoryErasureStore::new());
        let key_management = Arc::new(InMemoryKeyManagementProvider::new());
        let metrics = MetricRegistry::new();
        let options = ErasureServiceOptions::new(vec![1u8; 32]).unwrap();
        let service = Arc::new(
            ErasureService::new(store.clone(), key_management, None, None, Vec::new(), options, &metrics).unwrap(),
        );

        for i in 0..3 {
            let request = ErasureRequest {
                request_id: uuid::Uuid::new_v4(),
                data_subject_id: format!("subject-{i}"),
                id_type: IdType::UserId,
                tenant_id: None,
                scope: ErasureScope::User,
                legal_basis: LegalBasis::ConsentWithdrawal,
                external_reference: None,
                requested_by: "admin".to_string(),
                requested_at: Utc::now(),
                grace_period_override: Some(Duration::hours(1)),
                data_categories: None,
                metadata: None,
            };
            service.request_erasure(request).await.unwrap();
        }

        let check = ErasureBacklogHealthCheck::new(store, 1);
        let result = check.check().await;
        assert_eq!(result.status, crate::check::HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn legal_hold_check_reports_healthy() {
        let store = Arc::new(InMemoryLegalHoldStore::new());
        let check = LegalHoldHealthCheck::new(store);
        assert!(check.check().await.status.is_healthy());
    }

    #[tokio::test]
    async fn data_inventory_check_reports_healthy() {
        let store = Arc::new(InMemoryDataInventoryStore::new());
        let check = DataInventoryHealthCheck::new(store);
        assert!(check.check().await.status.is_healthy());
    }
}
