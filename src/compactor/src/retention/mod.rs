//! Size-based retention for the logkeep compactor.
//!
//! ## Architecture
//!
//! - `config`: Runtime settings of the trigger, derived from the service configuration
//! - `size_based`: Periodic single-flight trigger that runs compaction when the
//!   store's filesystem fills past a threshold
//! - `series`: Per-pass ledger deciding which series a compaction may drop
//! - `metrics`: Counters for trigger ticks and outcomes
//!
//! ## Usage
//!
//! ```no_run
//! use compactor::retention::{
//!     CompactionContext, RetentionTriggerConfig, SizeBasedRetentionService,
//! };
//! use std::path::PathBuf;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = RetentionTriggerConfig::new(80, ".data");
//! let service = SizeBasedRetentionService::new(
//!     config,
//!     |_ctx: CompactionContext, threshold: i32, dir: PathBuf| async move {
//!         println!("compacting {} at {threshold}%", dir.display());
//!         Ok::<(), anyhow::Error>(())
//!     },
//! );
//!
//! service.start().await?;
//! // ...
//! service.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod metrics;
pub mod series;
pub mod size_based;

// Re-export commonly used types
pub use config::RetentionTriggerConfig;
pub use metrics::RetentionMetrics;
pub use series::{Label, Labels, UserSeries, UserSeriesInfo, UserSeriesMap};
pub use size_based::{
    CompactionContext, CompactionFn, RetentionError, ServiceState, SizeBasedRetentionService,
    TickOutcome,
};
