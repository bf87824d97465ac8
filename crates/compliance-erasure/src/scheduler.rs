//! `ErasureSchedulerWorker`: the
//! background task that actually executes scheduled erasure requests once
//! their grace period elapses.
//!
//! Modeled on the same shutdown-channel shape as
//! `compliance_legal_hold::ExpirationWorkerHandle` and
//! `compliance_keys::MultiRegionKeyProvider`'s health-check loop: a ticker
//! awaits `poll_interval`, claims a bounded batch via the store's
//! `ErasureQueryStore` capability, executes each claimed request with its
//! own timeout, and swallows per-request failures so one bad request never
//! stalls the loop. Disabling the scheduler (never calling `spawn`) is
//! observable: no query-store or execute calls happen at all.

use crate::service::ErasureService;
use compliance_types::ErasureStore;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Poll cadence, per-request execution timeout, and batch size for the
/// scheduler loop. No field has spec-mandated defaults beyond the poll
/// interval implied by "awaits `poll_interval`"; the others are picked to
/// keep a single sweep bounded.
#[derive(Clone, Debug)]
pub struct SchedulerOptions {
    pub poll_interval: StdDuration,
    pub batch_size: usize,
    pub request_timeout: StdDuration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            poll_interval: StdDuration::from_secs(60),
            batch_size: 50,
            request_timeout: StdDuration::from_secs(30),
        }
    }
}

pub struct ErasureSchedulerWorker {
    store: Arc<dyn ErasureStore>,
    erasure: Arc<ErasureService>,
    options: SchedulerOptions,
}

impl ErasureSchedulerWorker {
    pub fn new(store: Arc<dyn ErasureStore>, erasure: Arc<ErasureService>, options: SchedulerOptions) -> Arc<Self> {
        Arc::new(Self { store, erasure, options })
    }

    /// Spawns the loop. Returns a handle the caller uses to stop it; the
    /// loop never runs unless this is called, so a caller that never
    /// spawns it gets a scheduler that performs zero query-store or
    /// execute calls.
    pub fn spawn(self: &Arc<Self>) -> SchedulerHandle {
        let (tx, mut rx) = mpsc::channel::<()>(1);
        let this = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.options.poll_interval);
            loop {
                tokio::select! {
                    _ = rx.recv() => break,
                    _ = ticker.tick() => {
                        this.run_sweep().await;
                    }
                }
            }
        });
        SchedulerHandle { shutdown_tx: Some(tx), handle: Some(handle) }
    }

    async fn run_sweep(&self) {
        let Some(query) = self.store.query_store() else {
            tracing::warn!("erasure store has no query-store capability; scheduler sweep skipped");
            return;
        };
        let due = match query.get_scheduled_requests(self.options.batch_size).await {
            Ok(due) => due,
            Err(err) => {
                tracing::warn!(%err, "failed to list scheduled erasure requests");
                return;
            }
        };
        for status in due {
            let result = tokio::time::timeout(self.options.request_timeout, self.erasure.execute(status.request_id)).await;
            match result {
                Ok(Ok(outcome)) if outcome.success => {
                    tracing::info!(request_id = %status.request_id, keys_deleted = outcome.keys_deleted, "erasure request executed by scheduler");
                }
                Ok(Ok(outcome)) => {
                    tracing::warn!(request_id = %status.request_id, reason = ?outcome.failure_reason, "scheduler claim did not complete the request");
                }
                Ok(Err(err)) => {
                    tracing::warn!(request_id = %status.request_id, %err, "erasure execution failed during scheduled sweep");
                }
                Err(_) => {
                    tracing::warn!(request_id = %status.request_id, timeout_ms = self.options.request_timeout.as_millis(), "erasure execution timed out during scheduled sweep");
                }
            }
        }
    }
}

pub struct SchedulerHandle {
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}
