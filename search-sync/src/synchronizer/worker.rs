//! Worker draining one task lane.
//!
//! Routes each task to the handler registered for its record kind.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::errors::SearchSyncError;
use crate::synchronizer::task::{IndexAction, IndexTask};

/// Executes index tasks for one record kind.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, action: IndexAction) -> Result<(), SearchSyncError>;
}

/// Configuration for the worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Interval between progress log lines.
    pub progress_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            progress_interval: Duration::from_secs(10),
        }
    }
}

/// Counters of a worker run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub processed: u64,
    pub failed: u64,
}

/// Drains a lane until it closes, shutdown is requested or the process is
/// interrupted.
///
/// Failed tasks are logged and counted, never retried here.
pub struct TaskWorker {
    lane: String,
    /// Taken by the first call to `run`.
    channels: Option<(mpsc::Receiver<IndexTask>, broadcast::Receiver<()>)>,
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
    config: WorkerConfig,
    shutdown_tx: broadcast::Sender<()>,
    total_processed: Arc<AtomicU64>,
    total_failed: Arc<AtomicU64>,
}

impl TaskWorker {
    pub fn new(lane: impl Into<String>, receiver: mpsc::Receiver<IndexTask>) -> Self {
        Self::with_config(lane, receiver, WorkerConfig::default())
    }

    pub fn with_config(
        lane: impl Into<String>,
        receiver: mpsc::Receiver<IndexTask>,
        config: WorkerConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        Self {
            lane: lane.into(),
            channels: Some((receiver, shutdown_rx)),
            handlers: HashMap::new(),
            config,
            shutdown_tx,
            total_processed: Arc::new(AtomicU64::new(0)),
            total_failed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Route tasks of `kind` to `handler`.
    pub fn register(&mut self, kind: impl Into<String>, handler: Arc<dyn TaskHandler>) {
        self.handlers.insert(kind.into(), handler);
    }

    /// Sender that stops [`TaskWorker::run`] when a value is sent on it.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Request a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    pub fn stats(&self) -> WorkerStats {
        WorkerStats {
            processed: self.total_processed.load(Ordering::Relaxed),
            failed: self.total_failed.load(Ordering::Relaxed),
        }
    }

    /// Process tasks until the lane closes or shutdown is requested.
    ///
    /// A worker runs once; later calls return the final counters at once.
    #[instrument(skip(self), fields(lane = %self.lane))]
    pub async fn run(&mut self) -> WorkerStats {
        let Some((mut receiver, mut shutdown_rx)) = self.channels.take() else {
            warn!("Task worker already ran");
            return self.stats();
        };
        info!(handlers = self.handlers.len(), "Starting task worker");

        let mut progress_timer = interval(self.config.progress_interval);
        progress_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut prev_processed: u64 = 0;
        let mut prev_time = Instant::now();

        loop {
            tokio::select! {
                task = receiver.recv() => {
                    match task {
                        Some(task) => self.process(task).await,
                        None => {
                            info!("Task lane closed");
                            break;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal");
                    break;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received interrupt, stopping task worker");
                    let _ = self.shutdown_tx.send(());
                    break;
                }
                _ = progress_timer.tick() => {
                    let processed = self.total_processed.load(Ordering::Relaxed);
                    let now = Instant::now();
                    let elapsed_secs = now.duration_since(prev_time).as_secs_f64();

                    if processed != prev_processed {
                        let tasks_per_sec = if elapsed_secs > 0.0 {
                            (processed - prev_processed) as f64 / elapsed_secs
                        } else {
                            0.0
                        };
                        info!(
                            tasks_processed = processed,
                            tasks_failed = self.total_failed.load(Ordering::Relaxed),
                            tasks_per_sec = format!("{:.1}", tasks_per_sec),
                            "Processing progress"
                        );
                    }
                    prev_processed = processed;
                    prev_time = now;
                }
            }
        }

        let stats = self.stats();
        info!(
            tasks_processed = stats.processed,
            tasks_failed = stats.failed,
            "Task worker stopped"
        );
        stats
    }

    async fn process(&self, task: IndexTask) {
        self.total_processed.fetch_add(1, Ordering::Relaxed);

        let Some(handler) = self.handlers.get(&task.kind) else {
            warn!(kind = %task.kind, id = %task.action.id(), "No handler registered for task kind");
            self.total_failed.fetch_add(1, Ordering::Relaxed);
            return;
        };

        let id = task.action.id().to_string();
        match handler.handle(task.action).await {
            Ok(()) => debug!(kind = %task.kind, id = %id, "Task completed"),
            Err(e) => {
                self.total_failed.fetch_add(1, Ordering::Relaxed);
                error!(kind = %task.kind, id = %id, error = %e, "Task failed");
            }
        }
    }
}
