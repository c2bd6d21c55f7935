//! logkeep Compactor Library
//!
//! Provides the size-based retention trigger that gates compaction on disk
//! usage, and the series ledger a compaction pass uses to decide which series
//! are safe to drop.

pub mod retention;

// Re-export commonly used types
pub use retention::{
    CompactionContext, CompactionFn, RetentionError, RetentionMetrics, RetentionTriggerConfig,
    ServiceState, SizeBasedRetentionService, TickOutcome, UserSeriesMap,
};
