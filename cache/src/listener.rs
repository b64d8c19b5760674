use std::fmt;
use std::sync::Arc;

/// Describes why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemovalCause {
  /// The entry was removed because the cache exceeded its weight capacity.
  Capacity,
  /// The entry was removed through an explicit invalidation.
  Explicit,
  /// The entry was overwritten by a new value for the same key.
  Replaced,
  /// The entry was removed by a bulk clear.
  Cleared,
}

impl RemovalCause {
  /// `true` if the entry was removed by the capacity policy rather than by a caller.
  pub fn was_evicted(&self) -> bool {
    matches!(self, RemovalCause::Capacity)
  }
}

impl fmt::Display for RemovalCause {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RemovalCause::Capacity => write!(f, "evicted due to capacity"),
      RemovalCause::Explicit => write!(f, "explicitly invalidated"),
      RemovalCause::Replaced => write!(f, "replaced by a new value"),
      RemovalCause::Cleared => write!(f, "removed by a bulk clear"),
    }
  }
}

/// A listener that is notified whenever an entry leaves the cache.
///
/// Notifications are delivered synchronously on the thread that caused the
/// removal, after the store lock has been released. The `value` is `None` for
/// entries that never carried a payload.
pub trait RemovalListener<K, V>: Send + Sync {
  fn on_remove(&self, key: K, value: Option<Arc<V>>, cause: RemovalCause);
}

impl<K, V, F> RemovalListener<K, V> for F
where
  F: Fn(K, Option<Arc<V>>, RemovalCause) + Send + Sync,
{
  fn on_remove(&self, key: K, value: Option<Arc<V>>, cause: RemovalCause) {
    self(key, value, cause)
  }
}
