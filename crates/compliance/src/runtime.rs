//! `ComplianceRuntime`: wires every subsystem crate into one object the
//! embedding application holds for the lifetime of the process. A
//! config-driven builder with one init step per subsystem, composed in
//! dependency order, plus a `shutdown` that tears down every background
//! worker it started.

use crate::config::ComplianceOptions;
use compliance_backup::InMemoryMasterKeyBackupService;
use compliance_crypto::{
    AesGcmProvider, EncryptionProvider, EncryptionProviderRegistry, KeyMaterialSource, RotatingEncryptionProvider,
    RotatingEncryptionProviderOptions,
};
use compliance_erasure::{
    CascadeErasureResolver, ErasureSchedulerWorker, ErasureService, ErasureServiceOptions, InMemoryErasureStore,
    SchedulerHandle, SchedulerOptions, VerificationService,
};
use compliance_health::{
    DataInventoryHealthCheck, ErasureBacklogHealthCheck, HealthCheck, HealthCheckAggregator, KeyManagementHealthCheck,
    LegalHoldHealthCheck, ReplicationHealthCheck,
};
use compliance_inventory::{DataInventoryService, InMemoryDataInventoryStore};
use compliance_keys::{InMemoryKeyManagementProvider, KeyCache, MultiRegionKeyProvider, MultiRegionOptions, RegionConfig};
use compliance_legal_hold::{ExpirationWorkerHandle, InMemoryLegalHoldStore, LegalHoldService};
use compliance_metrics::{MetricAggregator, MetricRegistry};
use compliance_types::{
    AuditStore, CascadeRelationshipResolver, ComplianceError, EncryptionAlgorithm, ErasureContributor,
    KeyManagementProvider, Result,
};
use std::sync::Arc;
use std::time::Duration as StdDuration;

const MASTER_KEY_ID: &str = "compliance-master";

/// Every running subsystem, ready for the embedding application to call
/// into. Background workers (legal-hold expiration sweep, erasure
/// scheduler, metrics window aggregation, multi-region health checks) are
/// already spawned by the time `build()` returns one of these.
pub struct ComplianceRuntime {
    pub metrics: Arc<MetricRegistry>,
    pub key_management: Arc<dyn KeyManagementProvider>,
    pub key_cache: Arc<KeyCache>,
    pub encryption: Arc<EncryptionProviderRegistry>,
    pub backup: Arc<InMemoryMasterKeyBackupService>,
    pub legal_hold: Arc<LegalHoldService>,
    pub inventory: Arc<DataInventoryService>,
    pub erasure: Arc<ErasureService>,
    pub verification: Arc<VerificationService>,
    pub cascade: Option<Arc<CascadeErasureResolver>>,
    pub health: Arc<HealthCheckAggregator>,

    metrics_aggregator: Option<Arc<MetricAggregator>>,
    legal_hold_worker: Option<ExpirationWorkerHandle>,
    erasure_scheduler: Option<SchedulerHandle>,
}

impl ComplianceRuntime {
    /// Stops every background worker this runtime started. Idempotent:
    /// the individual handles consume themselves on first call.
    pub async fn shutdown(mut self) {
        if let Some(worker) = self.legal_hold_worker.take() {
            worker.stop().await;
        }
        if let Some(scheduler) = self.erasure_scheduler.take() {
            scheduler.stop().await;
        }
        if let Some(aggregator) = self.metrics_aggregator.take() {
            aggregator.dispose().await;
        }
    }
}

/// A secondary key-management region opted into via
/// [`ComplianceRuntimeBuilder::with_secondary_region`]. Disabled by
/// default: see [`crate::config::MultiRegionSettings`].
pub struct SecondaryRegion {
    pub provider: Arc<dyn KeyManagementProvider>,
    pub primary_region: RegionConfig,
    pub secondary_region: RegionConfig,
}

/// Assembles a [`ComplianceRuntime`] from [`ComplianceOptions`] plus
/// whatever the embedding application must supply itself: contributors to
/// fan an erasure out to, an audit trail to check against, a relationship
/// graph for cascading erasure, and (optionally) a second key-management
/// region. Everything else — stores, key material, the encryption
/// provider, the health checks — gets a reference in-memory
/// implementation, so the runtime builds standalone when nothing external
/// is configured.
pub struct ComplianceRuntimeBuilder {
    options: ComplianceOptions,
    contributors: Vec<Arc<dyn ErasureContributor>>,
    audit_store: Option<Arc<dyn AuditStore>>,
    cascade_relationships: Option<Arc<dyn CascadeRelationshipResolver>>,
    secondary_region: Option<SecondaryRegion>,
}

impl ComplianceRuntimeBuilder {
    pub fn new(options: ComplianceOptions) -> Self {
        Self {
            options,
            contributors: Vec::new(),
            audit_store: None,
            cascade_relationships: None,
            secondary_region: None,
        }
    }

    /// Registers a system that must participate in every erasure
    /// execution — e.g. an adapter that
    /// scrubs one downstream store.
    pub fn with_contributor(mut self, contributor: Arc<dyn ErasureContributor>) -> Self {
        self.contributors.push(contributor);
        self
    }

    /// Wires the `AuditTrailConsistent` leg of erasure verification
    /// against the embedding application's audit log.
    pub fn with_audit_store(mut self, audit_store: Arc<dyn AuditStore>) -> Self {
        self.audit_store = Some(audit_store);
        self
    }

    /// Enables cascading erasure over the embedding application's
    /// relationship graph.
    pub fn with_cascade_relationships(mut self, resolver: Arc<dyn CascadeRelationshipResolver>) -> Self {
        self.cascade_relationships = Some(resolver);
        self
    }

    /// Opts into active/standby key-management failover. Without
    /// this, `key_management` is a single in-memory provider with no
    /// replication or health-check loop.
    pub fn with_secondary_region(mut self, secondary: SecondaryRegion) -> Self {
        self.secondary_region = Some(secondary);
        self
    }

    pub async fn build(self) -> Result<ComplianceRuntime> {
        let metrics = Arc::new(MetricRegistry::new());

        let primary_km = Arc::new(InMemoryKeyManagementProvider::new());
        primary_km.seed_key(MASTER_KEY_ID, EncryptionAlgorithm::Aes256Gcm, None);
        // Raw key-material resolution always goes through the primary
        // in-memory backend, multi-region or not: replicating key bytes
        // themselves across regions is a key-management provider concern
        //, not the encryption layer's.
        let key_source: Arc<dyn KeyMaterialSource> = primary_km.clone();

        let multi_region: Option<Arc<MultiRegionKeyProvider>> = match &self.secondary_region {
            Some(region) => {
                let options = MultiRegionOptions {
                    health_check_interval: StdDuration::from_secs(self.options.multi_region.health_check_interval_secs),
                    enable_automatic_failover: self.options.multi_region.enable_automatic_failover,
                    failover_threshold: self.options.multi_region.failover_threshold,
                    operation_timeout: StdDuration::from_secs(self.options.multi_region.operation_timeout_secs),
                    ..Default::default()
                };
                Some(MultiRegionKeyProvider::new(
                    primary_km.clone(),
                    region.primary_region.clone(),
                    region.provider.clone(),
                    region.secondary_region.clone(),
                    options,
                ))
            }
            None => None,
        };
        let key_management: Arc<dyn KeyManagementProvider> = match &multi_region {
            Some(provider) => provider.clone(),
            None => primary_km.clone(),
        };

        let key_cache = Arc::new(KeyCache::new(true));

        let encryption = Arc::new(EncryptionProviderRegistry::new());
        let aes_gcm: Arc<dyn EncryptionProvider> = Arc::new(AesGcmProvider::new("aes-256-gcm", key_source.clone()));
        let primary_provider: Arc<dyn EncryptionProvider> = if self.options.crypto.auto_rotate_before_encryption
            || self.options.crypto.re_encrypt_on_read
        {
            Arc::new(RotatingEncryptionProvider::new(
                aes_gcm,
                key_management.clone(),
                RotatingEncryptionProviderOptions {
                    auto_rotate_before_encryption: self.options.crypto.auto_rotate_before_encryption,
                    re_encrypt_on_read: self.options.crypto.re_encrypt_on_read,
                    max_key_age: chrono::Duration::days(self.options.crypto.max_key_age_days),
                },
            ))
        } else {
            aes_gcm
        };
        encryption.register("aes-256-gcm", primary_provider.clone())?;
        encryption.set_primary("aes-256-gcm")?;

        let backup = Arc::new(InMemoryMasterKeyBackupService::new(
            key_management.clone(),
            key_source.clone(),
            primary_provider,
        ));

        let legal_hold_store = Arc::new(InMemoryLegalHoldStore::new());
        let legal_hold = Arc::new(LegalHoldService::new(legal_hold_store.clone()));
        let legal_hold_worker = Some(
            legal_hold.spawn_expiration_worker(StdDuration::from_secs(self.options.legal_hold.expiration_poll_interval_secs)),
        );

        let inventory_store = Arc::new(InMemoryDataInventoryStore::new());
        let inventory = Arc::new(DataInventoryService::new(inventory_store.clone(), key_management.clone()));

        let erasure_store = Arc::new(InMemoryErasureStore::new());
        let signing_key = self
            .options
            .signing_key()
            .map_err(|e| ComplianceError::configuration(e.to_string()))?;
        // Validates the minimum signing-key length; the rest of the
        // returned defaults are immediately overridden from config below.
        ErasureServiceOptions::new(signing_key.clone())?;
        let erasure_options = ErasureServiceOptions {
            default_grace_period: chrono::Duration::hours(self.options.erasure.default_grace_period_hours),
            minimum_grace_period: chrono::Duration::hours(self.options.erasure.minimum_grace_period_hours),
            maximum_grace_period: chrono::Duration::days(self.options.erasure.maximum_grace_period_days),
            signing_key,
        };
        let erasure = Arc::new(ErasureService::new(
            erasure_store.clone(),
            key_management.clone(),
            Some(legal_hold.clone()),
            Some(inventory.clone()),
            self.contributors,
            erasure_options,
            &metrics,
        )?);

        let erasure_scheduler = Some(
            ErasureSchedulerWorker::new(
                erasure_store.clone(),
                erasure.clone(),
                SchedulerOptions {
                    poll_interval: StdDuration::from_secs(self.options.erasure.scheduler_poll_interval_secs),
                    batch_size: self.options.erasure.scheduler_batch_size,
                    request_timeout: StdDuration::from_secs(self.options.erasure.scheduler_request_timeout_secs),
                },
            )
            .spawn(),
        );

        let verification = Arc::new(VerificationService::new(
            erasure_store.clone(),
            key_management.clone(),
            Some(inventory.clone()),
            self.audit_store.clone(),
        ));

        let cascade = self
            .cascade_relationships
            .map(|resolver| Arc::new(CascadeErasureResolver::new(resolver, erasure.clone())));

        let mut health_checks: Vec<Arc<dyn HealthCheck>> = vec![
            Arc::new(KeyManagementHealthCheck::new(key_management.clone())),
            Arc::new(ErasureBacklogHealthCheck::new(
                erasure_store.clone(),
                self.options.health.erasure_backlog_degraded_threshold,
            )),
            Arc::new(LegalHoldHealthCheck::new(legal_hold_store)),
            Arc::new(DataInventoryHealthCheck::new(inventory_store)),
        ];
        if let Some(provider) = &multi_region {
            health_checks.push(Arc::new(ReplicationHealthCheck::new(provider.clone())));
        }
        let health = Arc::new(HealthCheckAggregator::new(
            health_checks,
            StdDuration::from_millis(self.options.health.per_check_timeout_ms),
        ));

        let metrics_aggregator = if self.options.metrics.aggregation_window_secs > 0 {
            let aggregator = Arc::new(MetricAggregator::new(
                metrics.clone(),
                StdDuration::from_secs(self.options.metrics.aggregation_window_secs),
                Arc::new(|snapshots| {
                    tracing::debug!(families = snapshots.len(), "metrics window closed");
                }),
            ));
            aggregator.start();
            Some(aggregator)
        } else {
            None
        };

        Ok(ComplianceRuntime {
            metrics,
            key_management,
            key_cache,
            encryption,
            backup,
            legal_hold,
            inventory,
            erasure,
            verification,
            cascade,
            health,
            metrics_aggregator,
            legal_hold_worker,
            erasure_scheduler,
        })
    }
}
