//! `MultiRegionKeyProvider`: composes two key-management backends
//! under an explicit active/standby state machine with a background
//! health-check loop and manual failover/failback.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use compliance_types::{ComplianceError, EncryptionAlgorithm, KeyManagementProvider, KeyMetadata, KeyStatus, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplicationMode {
    Synchronous,
    Asynchronous,
}

#[derive(Clone, Debug)]
pub struct RegionConfig {
    pub region_id: String,
    pub endpoint: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ActiveRegion {
    Primary,
    Secondary,
}

#[derive(Clone, Debug)]
pub struct MultiRegionOptions {
    pub replication_mode: ReplicationMode,
    pub health_check_interval: StdDuration,
    pub enable_automatic_failover: bool,
    pub failover_threshold: u32,
    pub operation_timeout: StdDuration,
}

impl Default for MultiRegionOptions {
    fn default() -> Self {
        Self {
            replication_mode: ReplicationMode::Asynchronous,
            health_check_interval: StdDuration::from_secs(30),
            enable_automatic_failover: false,
            failover_threshold: 3,
            operation_timeout: StdDuration::from_secs(10),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ReplicationStatus {
    pub mode: ReplicationMode,
    pub active_region_id: String,
    pub in_failover: bool,
    pub last_sync_primary: Option<DateTime<Utc>>,
    pub last_sync_secondary: Option<DateTime<Utc>>,
}

struct SyncMarkers {
    primary: Option<DateTime<Utc>>,
    secondary: Option<DateTime<Utc>>,
}

pub struct MultiRegionKeyProvider {
    primary: Arc<dyn KeyManagementProvider>,
    secondary: Arc<dyn KeyManagementProvider>,
    primary_region: RegionConfig,
    secondary_region: RegionConfig,
    active: RwLock<ActiveRegion>,
    in_failover: AtomicBool,
    options: MultiRegionOptions,
    consecutive_primary_failures: AtomicU32,
    last_sync: RwLock<SyncMarkers>,
    shutdown_tx: Mutex<Option<mpsc::Sender<()>>>,
    health_task: Mutex<Option<JoinHandle<()>>>,
    disposed: AtomicBool,
}

impl MultiRegionKeyProvider {
    pub fn new(
        primary: Arc<dyn KeyManagementProvider>,
        primary_region: RegionConfig,
        secondary: Arc<dyn KeyManagementProvider>,
        secondary_region: RegionConfig,
        options: MultiRegionOptions,
    ) -> Arc<Self> {
        let provider = Arc::new(Self {
            primary,
            secondary,
            primary_region,
            secondary_region,
            active: RwLock::new(ActiveRegion::Primary),
            in_failover: AtomicBool::new(false),
            options,
            consecutive_primary_failures: AtomicU32::new(0),
            last_sync: RwLock::new(SyncMarkers { primary: None, secondary: None }),
            shutdown_tx: Mutex::new(None),
            health_task: Mutex::new(None),
            disposed: AtomicBool::new(false),
        });
        provider.spawn_health_check();
        provider
    }

    fn spawn_health_check(self: &Arc<Self>) {
        let (tx, mut rx) = mpsc::channel::<()>(1);
        let interval = self.options.health_check_interval;
        let this = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately
            loop {
                tokio::select! {
                    _ = rx.recv() => break,
                    _ = ticker.tick() => {
                        this.run_health_probe().await;
                    }
                }
            }
        });
        *self.shutdown_tx.lock() = Some(tx);
        *self.health_task.lock() = Some(handle);
    }

    async fn run_health_probe(&self) {
        let primary_ok = self.primary.list_keys(None, None).await.is_ok();
        let secondary_ok = self.secondary.list_keys(None, None).await.is_ok();
        let now = Utc::now();
        {
            let mut sync = self.last_sync.write().await;
            if primary_ok {
                sync.primary = Some(now);
            }
            if secondary_ok {
                sync.secondary = Some(now);
            }
        }

        if primary_ok {
            self.consecutive_primary_failures.store(0, Ordering::SeqCst);
            return;
        }
        let failures = self.consecutive_primary_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if self.options.enable_automatic_failover
            && failures >= self.options.failover_threshold
            && !self.in_failover.load(Ordering::SeqCst)
        {
            tracing::warn!(failures, "primary region unhealthy, triggering automatic failover");
            let _ = self.force_failover("automatic: consecutive health-check failures").await;
        }
    }

    fn check_disposed(&self) -> Result<()> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(ComplianceError::Disposed("MultiRegionKeyProvider".to_string()));
        }
        Ok(())
    }

    pub async fn force_failover(&self, reason: &str) -> Result<()> {
        self.check_disposed()?;
        if reason.trim().is_empty() {
            return Err(ComplianceError::configuration("failover reason must not be empty"));
        }
        if self.in_failover.load(Ordering::SeqCst) {
            return Err(ComplianceError::invariant("already in failover mode"));
        }
        *self.active.write().await = ActiveRegion::Secondary;
        self.in_failover.store(true, Ordering::SeqCst);
        tracing::warn!(reason, "forced failover to secondary region");
        Ok(())
    }

    pub async fn failback_to_primary(&self, reason: &str) -> Result<()> {
        self.check_disposed()?;
        if reason.trim().is_empty() {
            return Err(ComplianceError::configuration("failback reason must not be empty"));
        }
        if !self.in_failover.load(Ordering::SeqCst) {
            return Err(ComplianceError::invariant("not currently in failover mode"));
        }
        *self.active.write().await = ActiveRegion::Primary;
        self.in_failover.store(false, Ordering::SeqCst);
        tracing::info!(reason, "failed back to primary region");
        Ok(())
    }

    pub fn is_in_failover_mode(&self) -> bool {
        self.in_failover.load(Ordering::SeqCst)
    }

    pub async fn active_region_id(&self) -> String {
        match *self.active.read().await {
            ActiveRegion::Primary => self.primary_region.region_id.clone(),
            ActiveRegion::Secondary => self.secondary_region.region_id.clone(),
        }
    }

    pub async fn get_replication_status(&self) -> ReplicationStatus {
        let sync = self.last_sync.read().await;
        ReplicationStatus {
            mode: self.options.replication_mode,
            active_region_id: self.active_region_id().await,
            in_failover: self.is_in_failover_mode(),
            last_sync_primary: sync.primary,
            last_sync_secondary: sync.secondary,
        }
    }

    async fn active_provider(&self) -> Result<Arc<dyn KeyManagementProvider>> {
        self.check_disposed()?;
        Ok(match *self.active.read().await {
            ActiveRegion::Primary => self.primary.clone(),
            ActiveRegion::Secondary => self.secondary.clone(),
        })
    }

    /// Signals the health-check loop to stop and joins it within a
    /// bounded wall-clock budget (target < 2s). Idempotent.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let tx = self.shutdown_tx.lock().take();
        if let Some(tx) = tx {
            let _ = tx.send(()).await;
        }
        let handle = self.health_task.lock().take();
        if let Some(handle) = handle {
            let _ = tokio::time::timeout(StdDuration::from_secs(2), handle).await;
        }
    }
}

#[async_trait]
impl KeyManagementProvider for MultiRegionKeyProvider {
    async fn get_key(&self, key_id: &str) -> Result<KeyMetadata> {
        self.active_provider().await?.get_key(key_id).await
    }

    async fn get_active_key(&self, purpose: Option<&str>) -> Result<KeyMetadata> {
        self.active_provider().await?.get_active_key(purpose).await
    }

    async fn rotate_key(
        &self,
        key_id: &str,
        algorithm: EncryptionAlgorithm,
        purpose: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<KeyMetadata> {
        self.active_provider()
            .await?
            .rotate_key(key_id, algorithm, purpose, expires_at)
            .await
    }

    async fn list_keys(&self, status: Option<KeyStatus>, purpose: Option<&str>) -> Result<Vec<KeyMetadata>> {
        self.active_provider().await?.list_keys(status, purpose).await
    }

    async fn delete_key(&self, key_id: &str, grace_period_days: u32) -> Result<()> {
        self.active_provider().await?.delete_key(key_id, grace_period_days).await
    }

    async fn suspend_key(&self, key_id: &str, reason: &str) -> Result<()> {
        self.active_provider().await?.suspend_key(key_id, reason).await
    }
}
