use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_utils::CachePadded;

/// Internal occupancy counters kept by the weighted store.
/// All fields are atomic so they can be bumped without holding the store lock.
#[derive(Debug, Default)]
pub(crate) struct StoreStats {
  pub(crate) inserts: CachePadded<AtomicU64>,
  pub(crate) loads: CachePadded<AtomicU64>,
  pub(crate) load_failures: CachePadded<AtomicU64>,

  pub(crate) evicted_by_capacity: CachePadded<AtomicU64>,
  pub(crate) invalidations: CachePadded<AtomicU64>,
  pub(crate) replacements: CachePadded<AtomicU64>,
  pub(crate) cleared: CachePadded<AtomicU64>,
}

impl StoreStats {
  #[inline]
  pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
  }

  pub(crate) fn snapshot(&self, len: u64, weighted_size: u64) -> StoreStatsSnapshot {
    StoreStatsSnapshot {
      len,
      weighted_size,
      inserts: self.inserts.load(Ordering::Relaxed),
      loads: self.loads.load(Ordering::Relaxed),
      load_failures: self.load_failures.load(Ordering::Relaxed),
      evicted_by_capacity: self.evicted_by_capacity.load(Ordering::Relaxed),
      invalidations: self.invalidations.load(Ordering::Relaxed),
      replacements: self.replacements.load(Ordering::Relaxed),
      cleared: self.cleared.load(Ordering::Relaxed),
    }
  }
}

/// A point-in-time view of the store's occupancy and churn.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct StoreStatsSnapshot {
  /// The number of keys currently held.
  pub len: u64,
  /// The total weight currently held.
  pub weighted_size: u64,
  /// Entries written directly, including synthetic eviction occupants.
  pub inserts: u64,
  /// Entries admitted through a successful load.
  pub loads: u64,
  /// Loads whose loader returned an error or panicked.
  pub load_failures: u64,
  /// Entries removed by the capacity policy.
  pub evicted_by_capacity: u64,
  /// Entries removed by explicit invalidation.
  pub invalidations: u64,
  /// Entries overwritten by a write to the same key.
  pub replacements: u64,
  /// Entries removed by bulk clears.
  pub cleared: u64,
}

impl fmt::Debug for StoreStatsSnapshot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("StoreStatsSnapshot")
      .field("len", &self.len)
      .field("weighted_size", &self.weighted_size)
      .field("inserts", &self.inserts)
      .field("loads", &self.loads)
      .field("load_failures", &self.load_failures)
      .field("evicted_by_capacity", &self.evicted_by_capacity)
      .field("invalidations", &self.invalidations)
      .field("replacements", &self.replacements)
      .field("cleared", &self.cleared)
      .finish()
  }
}
