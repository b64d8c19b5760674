pub mod config;

use crate::decider::{DeciderCache, ReplayEngine};
use crate::error::BuildError;
use crate::listener::RemovalListener;
use crate::metrics::{MetricsSink, NoopMetricsSink};

pub use config::StickyCacheConfig;

use core::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// The capacity used when none is configured.
pub const DEFAULT_CAPACITY: u64 = 600;

/// The largest accepted capacity.
pub const MAX_CAPACITY: u64 = u64::MAX / 2;

/// The upper bound of the random wait for the eviction lock.
pub const DEFAULT_MAX_EVICTION_WAIT: Duration = Duration::from_secs(4);

/// A builder for [`DeciderCache`] instances.
pub struct DeciderCacheBuilder<D: ReplayEngine> {
  capacity: u64,
  max_eviction_wait: Duration,
  metrics: Option<Arc<dyn MetricsSink>>,
  listener: Option<Arc<dyn RemovalListener<String, D>>>,
  _decider_marker: PhantomData<fn() -> D>,
}

impl<D: ReplayEngine> fmt::Debug for DeciderCacheBuilder<D> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DeciderCacheBuilder")
      .field("capacity", &self.capacity)
      .field("max_eviction_wait", &self.max_eviction_wait)
      .field("has_metrics_sink", &self.metrics.is_some())
      .field("has_listener", &self.listener.is_some())
      .finish()
  }
}

impl<D: ReplayEngine> Default for DeciderCacheBuilder<D> {
  fn default() -> Self {
    Self {
      capacity: DEFAULT_CAPACITY,
      max_eviction_wait: DEFAULT_MAX_EVICTION_WAIT,
      metrics: None,
      listener: None,
      _decider_marker: PhantomData,
    }
  }
}

impl<D: ReplayEngine + 'static> DeciderCacheBuilder<D> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Creates a builder preloaded with the values of `config`.
  pub fn from_config(config: &StickyCacheConfig) -> Self {
    Self::new()
      .capacity(config.capacity)
      .max_eviction_wait(config.max_eviction_wait())
  }

  /// Sets the maximum number of deciders the cache holds.
  pub fn capacity(mut self, capacity: u64) -> Self {
    self.capacity = capacity;
    self
  }

  /// Sets the upper bound of the random wait used when acquiring the eviction
  /// lock. `Duration::ZERO` makes every acquisition a single non-blocking try.
  pub fn max_eviction_wait(mut self, wait: Duration) -> Self {
    self.max_eviction_wait = wait;
    self
  }

  /// Sets the sink that receives size, hit, miss and eviction telemetry.
  ///
  /// Defaults to [`NoopMetricsSink`].
  pub fn metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
    self.metrics = Some(sink);
    self
  }

  /// Registers a listener notified of every decider that leaves the cache,
  /// after the decider has been closed.
  pub fn removal_listener<Listener>(mut self, listener: Listener) -> Self
  where
    Listener: RemovalListener<String, D> + 'static,
  {
    self.listener = Some(Arc::new(listener));
    self
  }

  pub fn build(self) -> Result<DeciderCache<D>, BuildError> {
    if self.capacity == 0 {
      return Err(BuildError::ZeroCapacity);
    }
    if self.capacity > MAX_CAPACITY {
      return Err(BuildError::CapacityTooLarge {
        capacity: self.capacity,
        max: MAX_CAPACITY,
      });
    }
    let metrics = self
      .metrics
      .unwrap_or_else(|| Arc::new(NoopMetricsSink));

    Ok(DeciderCache::from_parts(
      self.capacity,
      metrics,
      self.max_eviction_wait,
      self.listener,
    ))
  }
}
