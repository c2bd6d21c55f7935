//! Size-Based Retention Trigger
//!
//! Samples the filesystem usage of the store directory on a fixed interval
//! and runs a caller-supplied compaction routine whenever usage reaches the
//! configured threshold.
//!
//! ## Guarantees
//!
//! - At most one compaction runs at a time: every evaluation holds an async
//!   lock, so a slow tick delays the next one instead of overlapping it
//! - A usage percentage equal to the threshold triggers compaction
//! - Tick failures are logged and the schedule keeps running
//! - Stopping never aborts a running compaction; the callback observes
//!   shutdown through its [`CompactionContext`]

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use common::storage::{DiskStatus, DiskUsageError, DiskUsageProvider, FilesystemProbe};
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::config::RetentionTriggerConfig;
use super::metrics::RetentionMetrics;

/// Cancellation handle passed to every compaction invocation.
#[derive(Debug, Clone)]
pub struct CompactionContext {
    shutdown: watch::Receiver<bool>,
}

impl CompactionContext {
    /// Whether the service has been asked to stop.
    pub fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Resolves once the service has been asked to stop.
    pub async fn cancelled(&mut self) {
        while !*self.shutdown.borrow_and_update() {
            // A closed channel means the service is gone, which counts as cancelled.
            if self.shutdown.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Compaction routine run when disk usage crosses the threshold.
///
/// Closures of the form
/// `Fn(CompactionContext, i32, PathBuf) -> impl Future<Output = anyhow::Result<()>>`
/// implement this trait.
#[async_trait]
pub trait CompactionFn: Send + Sync {
    async fn compact(
        &self,
        ctx: CompactionContext,
        threshold: i32,
        working_directory: &Path,
    ) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> CompactionFn for F
where
    F: Fn(CompactionContext, i32, PathBuf) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn compact(
        &self,
        ctx: CompactionContext,
        threshold: i32,
        working_directory: &Path,
    ) -> anyhow::Result<()> {
        self(ctx, threshold, working_directory.to_path_buf()).await
    }
}

/// Lifecycle of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    New,
    Starting,
    Running,
    Stopping,
    Terminated,
}

/// Successful result of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Usage was below the threshold; nothing ran.
    Skipped { used_percent: f64 },
    /// Usage reached the threshold and compaction completed.
    Compacted { used_percent: f64 },
}

#[derive(Error, Debug)]
pub enum RetentionError {
    /// Disk usage could not be determined; compaction was not attempted.
    #[error("size-based retention could not probe disk usage: {0}")]
    Probe(#[from] DiskUsageError),

    /// The compaction callback failed.
    #[error("size-based compaction failed: {0}")]
    Compaction(#[source] anyhow::Error),

    /// The blocking disk usage task panicked or was cancelled.
    #[error("size-based retention disk usage task failed: {0}")]
    DiskUsageTask(#[source] tokio::task::JoinError),

    #[error("size-based retention service already started")]
    AlreadyStarted,
}

struct Inner {
    config: RetentionTriggerConfig,
    // Shared with the blocking disk usage task.
    disk_usage: Arc<dyn DiskUsageProvider>,
    compaction: Box<dyn CompactionFn>,
    // Guards evaluate-and-compact.
    tick_lock: Mutex<()>,
    metrics: RetentionMetrics,
    shutdown: watch::Receiver<bool>,
}

/// Periodic, single-flight size-based retention trigger.
pub struct SizeBasedRetentionService {
    inner: Arc<Inner>,
    shutdown: watch::Sender<bool>,
    state: watch::Sender<ServiceState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SizeBasedRetentionService {
    /// Create a service probing the real filesystem.
    pub fn new(config: RetentionTriggerConfig, compaction: impl CompactionFn + 'static) -> Self {
        Self::with_disk_usage_provider(config, FilesystemProbe, compaction)
    }

    /// Create a service with an injected disk usage source.
    pub fn with_disk_usage_provider(
        config: RetentionTriggerConfig,
        disk_usage: impl DiskUsageProvider + 'static,
        compaction: impl CompactionFn + 'static,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, _) = watch::channel(ServiceState::New);

        Self {
            inner: Arc::new(Inner {
                config,
                disk_usage: Arc::new(disk_usage),
                compaction: Box::new(compaction),
                tick_lock: Mutex::new(()),
                metrics: RetentionMetrics::new(),
                shutdown: shutdown_rx,
            }),
            shutdown: shutdown_tx,
            state: state_tx,
            task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &RetentionTriggerConfig {
        &self.inner.config
    }

    pub fn metrics(&self) -> &RetentionMetrics {
        &self.inner.metrics
    }

    pub fn state(&self) -> ServiceState {
        *self.state.borrow()
    }

    /// Start the timer task. The first evaluation happens one interval from now.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(&self) -> Result<(), RetentionError> {
        let claimed = self.state.send_if_modified(|state| {
            if *state == ServiceState::New {
                *state = ServiceState::Starting;
                true
            } else {
                false
            }
        });
        if !claimed {
            return Err(RetentionError::AlreadyStarted);
        }

        info!(
            interval = ?self.inner.config.interval(),
            threshold = self.inner.config.threshold(),
            working_directory = %self.inner.config.working_directory().display(),
            "size-based retention service is starting"
        );

        let handle = tokio::spawn(Arc::clone(&self.inner).run());
        *self.task.lock().await = Some(handle);

        self.state.send_if_modified(|state| {
            if *state == ServiceState::Starting {
                *state = ServiceState::Running;
                true
            } else {
                false
            }
        });
        Ok(())
    }

    /// Request shutdown and wait for the timer task to finish.
    ///
    /// An in-flight compaction is allowed to complete; it sees the request
    /// through [`CompactionContext`].
    pub async fn stop(&self) {
        self.state.send_replace(ServiceState::Stopping);
        info!("size-based retention service is stopping");

        self.shutdown.send_replace(true);

        let handle = self.task.lock().await.take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!(error = %e, "size-based retention loop ended abnormally");
        }

        self.state.send_replace(ServiceState::Terminated);
    }

    /// Probe disk usage and compare it with the threshold, without compacting.
    pub fn threshold_exceeded(&self) -> Result<bool, DiskUsageError> {
        let status = self.inner.disk_usage()?;
        Ok(self.inner.exceeds_threshold(&status))
    }

    /// Run a single evaluation: probe, compare and compact if needed.
    ///
    /// Serialized with the timer task; concurrent callers wait their turn.
    pub async fn run_once(&self) -> Result<TickOutcome, RetentionError> {
        self.inner.run_once().await
    }
}

impl Inner {
    async fn run(self: Arc<Self>) {
        let period = self.config.interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once().await {
                        warn!(error = %e, "size-based retention tick failed");
                    }
                }
            }
        }

        debug!("size-based retention loop exited");
    }

    async fn run_once(&self) -> Result<TickOutcome, RetentionError> {
        let _guard = self.tick_lock.lock().await;
        self.metrics.record_tick();

        let status = match self.sample_disk_usage().await {
            Ok(status) => status,
            Err(e) => {
                self.metrics.record_probe_failure();
                info!(error = %e, "size-based compaction failed");
                return Err(e);
            }
        };

        let used_percent = status.used_percent();
        if !self.exceeds_threshold(&status) {
            self.metrics.record_skipped();
            return Ok(TickOutcome::Skipped { used_percent });
        }

        info!("running size-based compaction");
        self.metrics.record_compaction_triggered();

        let ctx = CompactionContext {
            shutdown: self.shutdown.clone(),
        };
        if let Err(e) = self
            .compaction
            .compact(ctx, self.config.threshold(), self.config.working_directory())
            .await
        {
            self.metrics.record_compaction_failed();
            return Err(RetentionError::Compaction(e));
        }

        Ok(TickOutcome::Compacted { used_percent })
    }

    /// Runs the provider off the async workers; `statvfs` on a stalled mount can block.
    async fn sample_disk_usage(&self) -> Result<DiskStatus, RetentionError> {
        let provider = Arc::clone(&self.disk_usage);
        let path = self.config.working_directory().to_path_buf();
        let status = tokio::task::spawn_blocking(move || provider.disk_usage(&path))
            .await
            .map_err(RetentionError::DiskUsageTask)??;
        Ok(self.observe(status))
    }

    fn disk_usage(&self) -> Result<DiskStatus, DiskUsageError> {
        let status = self
            .disk_usage
            .disk_usage(self.config.working_directory())?;
        Ok(self.observe(status))
    }

    fn observe(&self, status: DiskStatus) -> DiskStatus {
        info!(
            usage = %format!("{:.2}%", status.used_percent()),
            "Detected disk usage percentage"
        );
        self.metrics.record_used_percent(status.used_percent());
        status
    }

    fn exceeds_threshold(&self, status: &DiskStatus) -> bool {
        if status.used_percent() < f64::from(self.config.threshold()) {
            debug!(
                used_percent = status.used_percent(),
                threshold = self.config.threshold(),
                "Disk usage below threshold, skipping compaction"
            );
            return false;
        }

        info!(
            used_percent = status.used_percent(),
            threshold = self.config.threshold(),
            "Disk usage threshold exceeded, running compaction"
        );
        true
    }
}
