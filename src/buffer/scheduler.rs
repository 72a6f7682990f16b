use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::registry::BufferRegistry;
use super::sink::SegmentSink;

/// Periodic background scan that flushes timed-out buffers
///
/// A session that stops sending fragments would otherwise never be flushed,
/// since readiness is only evaluated inside append. The scheduler guarantees
/// a bounded-latency flush even with zero new input.
///
/// Two states: Stopped (no task) and Running (task + shutdown channel held).
/// `start` is idempotent; `stop` cancels the pending wait and joins the loop
/// before returning, so no further flushes fire once it returns.
pub struct FlushScheduler {
    registry: Arc<BufferRegistry>,
    sink: Arc<dyn SegmentSink>,
    scan_interval: Duration,
    task: Mutex<Option<(watch::Sender<bool>, JoinHandle<()>)>>,
}

impl FlushScheduler {
    pub fn new(
        registry: Arc<BufferRegistry>,
        sink: Arc<dyn SegmentSink>,
        scan_interval: Duration,
    ) -> Self {
        Self {
            registry,
            sink,
            scan_interval,
            task: Mutex::new(None),
        }
    }

    /// Start the scan loop; a no-op if already running
    pub async fn start(&self) {
        let mut task = self.task.lock().await;
        if task.is_some() {
            warn!("Flush scheduler already running");
            return;
        }

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let registry = Arc::clone(&self.registry);
        let sink = Arc::clone(&self.sink);
        let scan_interval = self.scan_interval;

        let handle = tokio::spawn(async move {
            info!("Flush scheduler started (interval: {:?})", scan_interval);

            let mut ticker = tokio::time::interval(scan_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let flushed = registry.flush_ready(&sink).await;
                        if flushed > 0 {
                            debug!("Scheduler tick flushed {} buffers", flushed);
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }

            info!("Flush scheduler stopped");
        });

        *task = Some((shutdown_tx, handle));
    }

    /// Stop the scan loop and wait for it to exit; a no-op if not running
    ///
    /// Holds the state lock across the join so a racing `start` cannot spawn
    /// a second loop while the first is still winding down.
    pub async fn stop(&self) {
        let mut task = self.task.lock().await;
        let Some((shutdown_tx, handle)) = task.take() else {
            warn!("Flush scheduler not running");
            return;
        };

        // The receiver lives in the loop, so this only fails if the task
        // already exited
        let _ = shutdown_tx.send(true);

        if let Err(e) = handle.await {
            error!("Flush scheduler task panicked: {}", e);
        }
    }

    pub async fn is_running(&self) -> bool {
        self.task.lock().await.is_some()
    }
}
