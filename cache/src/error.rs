use thiserror::Error;

/// Errors that can occur when building a [`DeciderCache`](crate::DeciderCache).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
  /// The cache was configured with a capacity of zero. A sticky cache must be
  /// able to hold at least one decider.
  #[error("max cache size must be greater than 0")]
  ZeroCapacity,
  /// The capacity leaves no headroom for the forced-eviction sentinel, whose
  /// weight can reach `capacity + 1`.
  #[error("max cache size {capacity} exceeds the supported maximum of {max}")]
  CapacityTooLarge { capacity: u64, max: u64 },
}

/// Returned when no cached decider exists for a run.
///
/// This is an expected, recoverable condition: the run was never cached, or it
/// has been evicted or invalidated since. The usual recovery is to request the
/// full history of the run and admit it again through
/// [`DeciderCache::get_or_create`](crate::DeciderCache::get_or_create).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cache was evicted for the decisionTask. RunId: {run_id}")]
pub struct EvictedError {
  run_id: String,
}

impl EvictedError {
  pub fn new(run_id: impl Into<String>) -> Self {
    Self {
      run_id: run_id.into(),
    }
  }

  /// The run whose cached state is missing.
  pub fn run_id(&self) -> &str {
    &self.run_id
  }
}
