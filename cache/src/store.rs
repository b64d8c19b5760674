use crate::entry::WeightedEntry;
use crate::listener::{RemovalCause, RemovalListener};
use crate::loader::{LoadFuture, LoadOutcome};
use crate::lru_list::LruList;
use crate::stats::{StoreStats, StoreStatsSnapshot};

use core::fmt;
use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;

use ahash::{HashMap, HashMapExt};
use parking_lot::Mutex;

/// Removals collected under the segment lock and delivered after it is released.
type Removed<K, V> = Vec<(K, WeightedEntry<V>, RemovalCause)>;

/// The single segment of the store: the entries and their access order.
struct Segment<K: Eq + Hash + Clone, V> {
  entries: HashMap<K, WeightedEntry<V>>,
  order: LruList<K>,
}

impl<K: Eq + Hash + Clone, V> Segment<K, V> {
  fn new() -> Self {
    Self {
      entries: HashMap::new(),
      order: LruList::new(),
    }
  }

  fn remove<Q>(&mut self, key: &Q) -> Option<(K, WeightedEntry<V>)>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.order.remove(key);
    self.entries.remove_entry(key)
  }
}

/// A bounded, weighted, least-recently-used store.
///
/// All structural changes go through one segment lock so that weight-driven
/// eviction is deterministic. Loaders run outside that lock; concurrent loads
/// of the same key are collapsed onto a single [`LoadFuture`].
///
/// Every removal, whatever its cause, is reported exactly once to the removal
/// listener, on the calling thread and after the segment lock is released.
pub(crate) struct WeightedStore<K: Eq + Hash + Clone, V> {
  segment: Mutex<Segment<K, V>>,
  pending_loads: Mutex<HashMap<K, Arc<LoadFuture<V>>>>,
  capacity: u64,
  listener: Arc<dyn RemovalListener<K, V>>,
  stats: StoreStats,
}

impl<K: Eq + Hash + Clone, V> fmt::Debug for WeightedStore<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WeightedStore")
      .field("capacity", &self.capacity)
      .field("stats", &self.stats())
      .finish_non_exhaustive()
  }
}

/// What a caller of the load path turned out to be.
enum Role<V> {
  Present(Arc<V>),
  Waiter(Arc<LoadFuture<V>>),
  Leader(Arc<LoadFuture<V>>),
}

/// Releases the pending slot of a load if the leader unwinds before finishing.
struct PendingLoad<'a, K: Eq + Hash + Clone, V> {
  store: &'a WeightedStore<K, V>,
  key: &'a K,
  future: Arc<LoadFuture<V>>,
}

impl<K: Eq + Hash + Clone, V> Drop for PendingLoad<'_, K, V> {
  fn drop(&mut self) {
    if !self.future.is_done() {
      self.store.pending_loads.lock().remove(self.key);
      StoreStats::bump(&self.store.stats.load_failures);
      self.future.fail();
    }
  }
}

impl<K: Eq + Hash + Clone, V> WeightedStore<K, V> {
  pub(crate) fn new(capacity: u64, listener: Arc<dyn RemovalListener<K, V>>) -> Self {
    Self {
      segment: Mutex::new(Segment::new()),
      pending_loads: Mutex::new(HashMap::new()),
      capacity,
      listener,
      stats: StoreStats::default(),
    }
  }

  pub(crate) fn capacity(&self) -> u64 {
    self.capacity
  }

  /// Number of keys currently held.
  pub(crate) fn len(&self) -> u64 {
    self.segment.lock().entries.len() as u64
  }

  /// Total weight currently held.
  pub(crate) fn weighted_size(&self) -> u64 {
    self.segment.lock().order.total_weight()
  }

  pub(crate) fn stats(&self) -> StoreStatsSnapshot {
    let (len, weighted_size) = {
      let segment = self.segment.lock();
      (segment.entries.len() as u64, segment.order.total_weight())
    };
    self.stats.snapshot(len, weighted_size)
  }

  /// Returns `true` if `key` currently holds an entry, without touching its recency.
  pub(crate) fn contains<Q>(&self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.segment.lock().entries.contains_key(key)
  }

  // Looks up a present entry and marks it most recently used.
  fn get_present<Q>(&self, key: &Q) -> Option<Arc<V>>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let mut segment = self.segment.lock();
    let payload = segment.entries.get(key)?.payload()?;
    segment.order.touch(key);
    Some(payload)
  }

  /// Returns the value for `key`, waiting for an in-flight load of it if there
  /// is one. Never starts a load.
  pub(crate) fn get<Q>(&self, key: &Q) -> Option<Arc<V>>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    if let Some(value) = self.get_present(key) {
      return Some(value);
    }

    let in_flight = self.pending_loads.lock().get(key).cloned();
    match in_flight {
      Some(future) => match future.wait() {
        LoadOutcome::Loaded(value) => Some(value),
        LoadOutcome::Failed => None,
      },
      // A load may have finished between the two lookups.
      None => self.get_present(key),
    }
  }

  fn join_or_lead(&self, key: &K) -> Role<V> {
    let mut pending = self.pending_loads.lock();
    // Checked under the pending lock: a leader publishes its value before it
    // clears its pending slot, so a miss here means no finished load is hiding.
    if let Some(value) = self.get_present(key) {
      return Role::Present(value);
    }
    if let Some(future) = pending.get(key) {
      return Role::Waiter(future.clone());
    }
    let future = Arc::new(LoadFuture::new());
    pending.insert(key.clone(), future.clone());
    Role::Leader(future)
  }

  /// Returns the value for `key`, running `init` to create it when absent.
  ///
  /// Concurrent callers for the same absent key run `init` at most once between
  /// them and all receive the same value. If `init` fails, its error goes to
  /// the caller that ran it, nothing is stored, and each waiting caller retries
  /// the load itself.
  pub(crate) fn get_or_try_insert_with<F, E>(&self, key: K, weight: u64, init: F) -> Result<Arc<V>, E>
  where
    F: FnOnce() -> Result<V, E>,
  {
    let future = loop {
      match self.join_or_lead(&key) {
        Role::Present(value) => return Ok(value),
        Role::Waiter(future) => {
          if let LoadOutcome::Loaded(value) = future.wait() {
            return Ok(value);
          }
        }
        Role::Leader(future) => break future,
      }
    };

    let guard = PendingLoad {
      store: self,
      key: &key,
      future,
    };

    match init() {
      Ok(value) => {
        let value = Arc::new(value);
        let removed = self.write(key.clone(), WeightedEntry::new(value.clone(), weight));
        StoreStats::bump(&self.stats.loads);

        self.pending_loads.lock().remove(&key);
        guard.future.complete(value.clone());
        drop(guard);

        self.notify(removed);
        Ok(value)
      }
      Err(err) => {
        self.pending_loads.lock().remove(&key);
        StoreStats::bump(&self.stats.load_failures);
        guard.future.fail();
        Err(err)
      }
    }
  }

  /// Writes an entry directly, replacing any existing entry for `key`.
  pub(crate) fn put(&self, key: K, entry: WeightedEntry<V>) {
    let removed = self.write(key, entry);
    StoreStats::bump(&self.stats.inserts);
    self.notify(removed);
  }

  // Inserts under the segment lock, then evicts from the cold end until the
  // total weight fits. The new entry is the hottest, so it goes last; an entry
  // heavier than the whole capacity evicts everything including itself.
  fn write(&self, key: K, entry: WeightedEntry<V>) -> Removed<K, V> {
    let mut removed = Vec::new();
    let mut segment = self.segment.lock();

    segment.order.push_front(key.clone(), entry.weight());
    if let Some(old) = segment.entries.insert(key.clone(), entry) {
      removed.push((key, old, RemovalCause::Replaced));
    }

    while segment.order.total_weight() > self.capacity {
      let Some((victim, _)) = segment.order.pop_back() else {
        break;
      };
      if let Some(evicted) = segment.entries.remove(&victim) {
        removed.push((victim, evicted, RemovalCause::Capacity));
      }
    }
    removed
  }

  /// Removes `key`, returning `true` if an entry was present.
  pub(crate) fn invalidate<Q>(&self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let removed = self.segment.lock().remove(key);
    match removed {
      Some((key, entry)) => {
        self.notify(vec![(key, entry, RemovalCause::Explicit)]);
        true
      }
      None => false,
    }
  }

  /// Removes every entry.
  pub(crate) fn invalidate_all(&self) {
    let drained: Removed<K, V> = {
      let mut segment = self.segment.lock();
      segment.order.clear();
      segment
        .entries
        .drain()
        .map(|(key, entry)| (key, entry, RemovalCause::Cleared))
        .collect()
    };
    self.notify(drained);
  }

  fn notify(&self, removed: Removed<K, V>) {
    for (key, entry, cause) in removed {
      match cause {
        RemovalCause::Capacity => StoreStats::bump(&self.stats.evicted_by_capacity),
        RemovalCause::Explicit => StoreStats::bump(&self.stats.invalidations),
        RemovalCause::Replaced => StoreStats::bump(&self.stats.replacements),
        RemovalCause::Cleared => StoreStats::bump(&self.stats.cleared),
      }
      self.listener.on_remove(key, entry.payload, cause);
    }
  }

  #[cfg(test)]
  pub(crate) fn keys_by_recency(&self) -> Vec<K> {
    self.segment.lock().order.keys_as_vec()
  }
}
