use std::sync::Arc;

/// A value held by the weighted store together with the capacity it consumes.
#[derive(Debug)]
pub(crate) struct WeightedEntry<V> {
  /// The stored value. `None` only for synthetic occupants such as the
  /// forced-eviction sentinel.
  pub(crate) payload: Option<Arc<V>>,
  weight: u64,
}

impl<V> WeightedEntry<V> {
  pub(crate) fn new(payload: Arc<V>, weight: u64) -> Self {
    Self {
      payload: Some(payload),
      weight,
    }
  }

  /// Creates an entry that occupies `weight` units but holds nothing.
  pub(crate) fn placeholder(weight: u64) -> Self {
    Self {
      payload: None,
      weight,
    }
  }

  #[inline]
  pub(crate) fn payload(&self) -> Option<Arc<V>> {
    self.payload.clone()
  }

  #[inline]
  pub(crate) fn weight(&self) -> u64 {
    self.weight
  }
}
