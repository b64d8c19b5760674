use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_utils::CachePadded;

/// The metrics emitted by the sticky cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StickyMetric {
  /// Gauge: number of runs currently cached.
  CacheSize,
  /// Counter: lookups that found a cached decider.
  CacheHit,
  /// Counter: lookups that found nothing.
  CacheMiss,
  /// Counter: forced evictions performed by `evict_next`.
  ThreadForcedEviction,
  /// Counter: every forced removal, from `evict_next` or explicit invalidation.
  TotalForcedEviction,
}

impl StickyMetric {
  pub const fn name(&self) -> &'static str {
    match self {
      StickyMetric::CacheSize => "sticky-cache-size",
      StickyMetric::CacheHit => "sticky-cache-hit",
      StickyMetric::CacheMiss => "sticky-cache-miss",
      StickyMetric::ThreadForcedEviction => "sticky-cache-thread-forced-eviction",
      StickyMetric::TotalForcedEviction => "sticky-cache-total-forced-eviction",
    }
  }
}

impl fmt::Display for StickyMetric {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// The reporting backend the cache writes its telemetry to.
///
/// Implementations are called on the hot path of every lookup and must not
/// block.
pub trait MetricsSink: Send + Sync {
  /// Sets a gauge to `value`.
  fn update_gauge(&self, metric: StickyMetric, value: u64);

  /// Increments a counter by `delta`.
  fn inc_counter(&self, metric: StickyMetric, delta: u64);
}

/// A sink that discards everything. Used when no sink is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
  fn update_gauge(&self, _metric: StickyMetric, _value: u64) {}

  fn inc_counter(&self, _metric: StickyMetric, _delta: u64) {}
}

/// An in-process sink backed by lock-free atomics.
#[derive(Debug)]
pub struct AtomicMetricsSink {
  cache_size: CachePadded<AtomicU64>,

  hits: CachePadded<AtomicU64>,
  misses: CachePadded<AtomicU64>,

  thread_forced_evictions: CachePadded<AtomicU64>,
  total_forced_evictions: CachePadded<AtomicU64>,

  created_at: Instant,
}

// Manual implementation of Default to handle the non-default `Instant`.
impl Default for AtomicMetricsSink {
  fn default() -> Self {
    Self {
      cache_size: CachePadded::new(AtomicU64::new(0)),
      hits: CachePadded::new(AtomicU64::new(0)),
      misses: CachePadded::new(AtomicU64::new(0)),
      thread_forced_evictions: CachePadded::new(AtomicU64::new(0)),
      total_forced_evictions: CachePadded::new(AtomicU64::new(0)),
      created_at: Instant::now(),
    }
  }
}

impl AtomicMetricsSink {
  pub fn new() -> Self {
    Self::default()
  }

  fn counter(&self, metric: StickyMetric) -> &AtomicU64 {
    match metric {
      StickyMetric::CacheSize => &*self.cache_size,
      StickyMetric::CacheHit => &*self.hits,
      StickyMetric::CacheMiss => &*self.misses,
      StickyMetric::ThreadForcedEviction => &*self.thread_forced_evictions,
      StickyMetric::TotalForcedEviction => &*self.total_forced_evictions,
    }
  }

  /// Creates a point-in-time snapshot of the recorded values.
  pub fn snapshot(&self) -> MetricsSnapshot {
    let hits = self.hits.load(Ordering::Relaxed);
    let misses = self.misses.load(Ordering::Relaxed);
    let total_lookups = hits + misses;

    MetricsSnapshot {
      cache_size: self.cache_size.load(Ordering::Relaxed),
      hits,
      misses,
      hit_ratio: if total_lookups == 0 {
        0.0
      } else {
        hits as f64 / total_lookups as f64
      },
      thread_forced_evictions: self.thread_forced_evictions.load(Ordering::Relaxed),
      total_forced_evictions: self.total_forced_evictions.load(Ordering::Relaxed),
      uptime_secs: self.created_at.elapsed().as_secs(),
    }
  }
}

impl MetricsSink for AtomicMetricsSink {
  fn update_gauge(&self, metric: StickyMetric, value: u64) {
    self.counter(metric).store(value, Ordering::Relaxed);
  }

  fn inc_counter(&self, metric: StickyMetric, delta: u64) {
    self.counter(metric).fetch_add(delta, Ordering::Relaxed);
  }
}

/// A point-in-time snapshot of an [`AtomicMetricsSink`].
#[derive(Clone)]
pub struct MetricsSnapshot {
  /// The last reported cache size.
  pub cache_size: u64,
  /// The number of lookups that found a cached decider.
  pub hits: u64,
  /// The number of lookups that found nothing.
  pub misses: u64,
  /// hits / (hits + misses).
  pub hit_ratio: f64,
  /// Forced evictions performed by `evict_next`.
  pub thread_forced_evictions: u64,
  /// All forced removals, including explicit invalidations.
  pub total_forced_evictions: u64,
  /// Seconds since the sink was created.
  pub uptime_secs: u64,
}

impl fmt::Debug for MetricsSnapshot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MetricsSnapshot")
      .field("cache_size", &self.cache_size)
      .field("hits", &self.hits)
      .field("misses", &self.misses)
      .field("hit_ratio", &format!("{:.2}%", self.hit_ratio * 100.0))
      .field("thread_forced_evictions", &self.thread_forced_evictions)
      .field("total_forced_evictions", &self.total_forced_evictions)
      .field("uptime_secs", &self.uptime_secs)
      .finish()
  }
}
