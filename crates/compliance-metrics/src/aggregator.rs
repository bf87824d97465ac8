//! Background window aggregator. Every `window_duration` it collects a
//! snapshot from the registry, hands it to the configured callback, then
//! resets counters/histograms for the next window. Shutdown follows the
//! node's own worker shape: a shutdown channel the background task
//! selects against, and a `Drop` impl that requests a stop if the owner
//! never called `dispose`.

use crate::registry::MetricRegistry;
use crate::snapshot::MetricFamilySnapshot;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::error;

pub type WindowCallback = Arc<dyn Fn(&[MetricFamilySnapshot]) + Send + Sync>;

/// Drives a registry's windowed snapshot/reset cycle on a background task.
/// The callback runs on the aggregator's own loop; a panic inside it is
/// caught and logged, never stopping the timer.
pub struct MetricAggregator {
    registry: Arc<MetricRegistry>,
    window: Duration,
    callback: WindowCallback,
    shutdown_tx: Mutex<Option<mpsc::Sender<()>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl MetricAggregator {
    pub fn new(registry: Arc<MetricRegistry>, window: Duration, on_window_complete: WindowCallback) -> Self {
        Self {
            registry,
            window,
            callback: on_window_complete,
            shutdown_tx: Mutex::new(None),
            handle: Mutex::new(None),
        }
    }

    /// Starts the background timer. A second call while already running
    /// is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut handle_guard = self.handle.lock();
        if handle_guard.is_some() {
            return;
        }
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        *self.shutdown_tx.lock() = Some(shutdown_tx);

        let this = self.clone();
        *handle_guard = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.window);
            ticker.tick().await; // first tick fires immediately, skip it
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let snapshot = this.registry.snapshot_and_reset();
                        this.run_callback(&snapshot);
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        }));
    }

    fn run_callback(&self, snapshot: &[MetricFamilySnapshot]) {
        let callback = self.callback.clone();
        let owned = snapshot.to_vec();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            callback(&owned);
        }));
        if let Err(panic) = result {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "metric window callback panicked".to_string());
            error!(error = %message, "metric aggregator callback failed");
        }
    }

    /// Stops the timer; subsequent windows are no-ops. A window already in
    /// flight completes before the loop exits.
    pub async fn dispose(&self) {
        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(()).await;
        }
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl Drop for MetricAggregator {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.try_send(());
        }
    }
}
