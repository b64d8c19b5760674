//! A bounded, concurrent cache holding one stateful replay decider per
//! workflow run, so decision tasks for a run can reuse its in-memory replay
//! state ("sticky execution") instead of replaying the full history each time.
//!
//! # Features
//! - **Admission rule**: full-history tasks always replace cached state;
//!   incremental tasks must hit the cache or fail with [`EvictedError`].
//! - **Single flight**: concurrent full-history tasks for one run build the
//!   decider once and share it.
//! - **Weighted LRU**: capacity is counted in weight units, and the least
//!   recently used run is evicted first.
//! - **Exactly-once close**: every decider leaving the cache, by eviction,
//!   invalidation or clear, is closed once.
//! - **Contention-aware eviction**: forced eviction and invalidation take a
//!   shared lock with a bounded random wait and back off when it is busy.
//! - **Observability**: size, hit, miss and eviction telemetry through an
//!   injected [`MetricsSink`], plus `tracing` events.

// Public modules that form the API
pub mod builder;
pub mod decider;
pub mod error;
pub mod listener;
pub mod metrics;
pub mod stats;
pub mod task;

// Internal, crate-only modules
mod entry;
mod loader;
mod lru_list;
mod store;

// Re-export the primary user-facing types for convenience
pub use builder::{DeciderCacheBuilder, StickyCacheConfig};
pub use decider::{DeciderCache, ReplayEngine};
pub use error::{BuildError, EvictedError};
pub use listener::{RemovalCause, RemovalListener};
pub use metrics::{AtomicMetricsSink, MetricsSink, MetricsSnapshot, NoopMetricsSink, StickyMetric};
pub use stats::StoreStatsSnapshot;
pub use task::{DecisionTask, EventType, History, HistoryEvent, WorkflowExecution};
