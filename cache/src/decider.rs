use crate::builder::DeciderCacheBuilder;
use crate::entry::WeightedEntry;
use crate::error::{BuildError, EvictedError};
use crate::listener::{RemovalCause, RemovalListener};
use crate::metrics::{MetricsSink, StickyMetric};
use crate::stats::StoreStatsSnapshot;
use crate::store::WeightedStore;
use crate::task::DecisionTask;

use core::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use rand::Rng;
use tracing::{debug, trace};
use uuid::Uuid;

/// Every cached decider occupies one unit of capacity.
const DECIDER_WEIGHT: u64 = 1;

/// The in-memory replay state of one workflow run.
///
/// The cache owns a decider from the moment it is admitted and calls
/// [`close`](ReplayEngine::close) exactly once, when the decider leaves the
/// cache.
pub trait ReplayEngine: Send + Sync {
  /// Releases whatever resources the decider holds.
  fn close(&self);
}

/// A bounded cache holding one [`ReplayEngine`] per workflow run, so decision
/// tasks for a run can reuse its replay state instead of replaying the full
/// history every time.
///
/// Tasks carrying the full history always replace whatever is cached for
/// their run. Incremental tasks must find their run cached, or fail with
/// [`EvictedError`].
pub struct DeciderCache<D: ReplayEngine> {
  store: WeightedStore<String, D>,
  metrics: Arc<dyn MetricsSink>,
  eviction_lock: Mutex<()>,
  sentinel_key: String,
  max_eviction_wait: Duration,
}

impl<D: ReplayEngine> fmt::Debug for DeciderCache<D> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("DeciderCache")
      .field("store", &self.store)
      .field("max_eviction_wait", &self.max_eviction_wait)
      .finish_non_exhaustive()
  }
}

impl<D: ReplayEngine + 'static> DeciderCache<D> {
  /// Creates a cache that holds at most `capacity` deciders.
  pub fn new(capacity: u64, metrics: Arc<dyn MetricsSink>) -> Result<Self, BuildError> {
    DeciderCacheBuilder::new()
      .capacity(capacity)
      .metrics_sink(metrics)
      .build()
  }

  pub fn builder() -> DeciderCacheBuilder<D> {
    DeciderCacheBuilder::new()
  }

  pub(crate) fn from_parts(
    capacity: u64,
    metrics: Arc<dyn MetricsSink>,
    max_eviction_wait: Duration,
    observer: Option<Arc<dyn RemovalListener<String, D>>>,
  ) -> Self {
    // Every removal path ends here, so each decider is closed exactly once.
    let on_remove = move |run_id: String, decider: Option<Arc<D>>, cause: RemovalCause| {
      let Some(decider) = decider else {
        return;
      };
      debug!(run_id = %run_id, %cause, "closing cached decider");
      decider.close();
      if let Some(observer) = &observer {
        observer.on_remove(run_id, Some(decider), cause);
      }
    };

    Self {
      store: WeightedStore::new(capacity, Arc::new(on_remove)),
      metrics,
      eviction_lock: Mutex::new(()),
      sentinel_key: Uuid::new_v4().to_string(),
      max_eviction_wait,
    }
  }

  /// Returns the decider for the task's run.
  ///
  /// A full-history task invalidates whatever is cached for the run and admits
  /// a decider built by `create`. Concurrent full-history calls for the same run
  /// share a single `create` invocation. Any error from `create` is returned
  /// unchanged and nothing is cached.
  ///
  /// An incremental task is served from the cache; if the run is not cached the
  /// [`EvictedError`] is converted into `E`.
  pub fn get_or_create<F, E>(&self, task: &DecisionTask, create: F) -> Result<Arc<D>, E>
  where
    F: FnOnce(&DecisionTask) -> Result<D, E>,
    E: From<EvictedError>,
  {
    let run_id = task.run_id();
    self.report_size();

    if !task.is_full_history() {
      return self.get_unchecked(run_id).map_err(E::from);
    }

    self.invalidate_run(run_id);
    let result = self
      .store
      .get_or_try_insert_with(run_id.to_owned(), DECIDER_WEIGHT, || {
        trace!(run_id, "creating decider from full history");
        create(task)
      });
    if result.is_err() {
      debug!(run_id, "decider creation failed, run stays uncached");
    }
    result
  }

  /// Returns the cached decider for `run_id` without creating one.
  pub fn get_unchecked(&self, run_id: &str) -> Result<Arc<D>, EvictedError> {
    match self.store.get(run_id) {
      Some(decider) => {
        self.metrics.inc_counter(StickyMetric::CacheHit, 1);
        trace!(run_id, "sticky cache hit");
        Ok(decider)
      }
      None => {
        self.metrics.inc_counter(StickyMetric::CacheMiss, 1);
        trace!(run_id, "sticky cache miss");
        Err(EvictedError::new(run_id))
      }
    }
  }

  /// Forces the least recently used decider out of the cache.
  ///
  /// Best effort: if another thread holds the eviction lock past a random
  /// wait, this returns without evicting anything.
  pub fn evict_next(&self) {
    let Some(_guard) = self.lock_for_eviction() else {
      debug!("eviction lock busy, skipping forced eviction");
      return;
    };

    let size = self.report_size();
    let capacity = self.store.capacity();
    let remaining = capacity.saturating_sub(self.store.weighted_size());

    // Overshoot capacity by one unit so the store has to evict to fit the
    // sentinel, then drop the sentinel itself.
    self
      .store
      .put(self.sentinel_key.clone(), WeightedEntry::placeholder(remaining.saturating_add(1)));
    self.store.invalidate(self.sentinel_key.as_str());

    self.metrics.inc_counter(StickyMetric::ThreadForcedEviction, 1);
    self.metrics.inc_counter(StickyMetric::TotalForcedEviction, 1);
    debug!(size, capacity, remaining, "forced eviction");
  }

  /// Invalidates the run the task belongs to. See [`invalidate_run`](Self::invalidate_run).
  pub fn invalidate(&self, task: &DecisionTask) {
    self.invalidate_run(task.run_id());
  }

  /// Removes and closes the decider cached for `run_id`.
  ///
  /// Like [`evict_next`](Self::evict_next), this waits only a bounded, random
  /// time for the eviction lock. If the lock stays busy, the request is dropped
  /// and the decider remains cached.
  pub fn invalidate_run(&self, run_id: &str) {
    let Some(_guard) = self.lock_for_eviction() else {
      debug!(run_id, "eviction lock busy, invalidation dropped");
      return;
    };
    let removed = self.store.invalidate(run_id);
    self.metrics.inc_counter(StickyMetric::TotalForcedEviction, 1);
    debug!(run_id, removed, "invalidated run");
  }

  /// Removes and closes every cached decider. Does not take the eviction lock.
  pub fn invalidate_all(&self) {
    let size = self.size();
    self.store.invalidate_all();
    debug!(size, "cleared sticky cache");
  }

  /// The number of runs currently cached.
  pub fn size(&self) -> u64 {
    self.store.len()
  }

  /// The total weight currently cached.
  pub fn weighted_size(&self) -> u64 {
    self.store.weighted_size()
  }

  pub fn capacity(&self) -> u64 {
    self.store.capacity()
  }

  /// Returns `true` if `run_id` is cached. Does not affect recency or metrics.
  pub fn contains(&self, run_id: &str) -> bool {
    self.store.contains(run_id)
  }

  pub fn store_stats(&self) -> StoreStatsSnapshot {
    self.store.stats()
  }

  fn report_size(&self) -> u64 {
    let size = self.size();
    self.metrics.update_gauge(StickyMetric::CacheSize, size);
    size
  }

  // Waits a uniformly random time for the lock so racing evictors back off
  // independently instead of queueing.
  fn lock_for_eviction(&self) -> Option<MutexGuard<'_, ()>> {
    let wait = if self.max_eviction_wait.is_zero() {
      Duration::ZERO
    } else {
      rand::rng().random_range(Duration::ZERO..self.max_eviction_wait)
    };
    let guard = self.eviction_lock.try_lock_for(wait);
    if guard.is_none() {
      trace!(?wait, "eviction lock acquisition timed out");
    }
    guard
  }

  #[cfg(test)]
  pub(crate) fn sentinel_key(&self) -> &str {
    &self.sentinel_key
  }

  #[cfg(test)]
  pub(crate) fn hold_eviction_lock(&self) -> MutexGuard<'_, ()> {
    self.eviction_lock.lock()
  }
}
