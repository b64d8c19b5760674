use super::{DEFAULT_CAPACITY, DEFAULT_MAX_EVICTION_WAIT};

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Plain-data settings for a sticky cache, as read from a worker's
/// configuration file.
///
/// Every field is optional when deserialized and falls back to the builder
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct StickyCacheConfig {
  /// Maximum number of cached deciders. Must be greater than zero.
  pub capacity: u64,
  /// Upper bound, in milliseconds, of the random eviction-lock wait.
  pub max_eviction_wait_ms: u64,
}

impl Default for StickyCacheConfig {
  fn default() -> Self {
    Self {
      capacity: DEFAULT_CAPACITY,
      max_eviction_wait_ms: DEFAULT_MAX_EVICTION_WAIT.as_millis() as u64,
    }
  }
}

impl StickyCacheConfig {
  pub fn max_eviction_wait(&self) -> Duration {
    Duration::from_millis(self.max_eviction_wait_ms)
  }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn missing_fields_fall_back_to_defaults() {
    let config: StickyCacheConfig = serde_json::from_str(r#"{ "capacity": 32 }"#).unwrap();
    assert_eq!(
      config,
      StickyCacheConfig {
        capacity: 32,
        max_eviction_wait_ms: 4000,
      }
    );
    assert_eq!(config.max_eviction_wait(), Duration::from_secs(4));
  }

  #[test]
  fn unknown_fields_are_rejected() {
    let result = serde_json::from_str::<StickyCacheConfig>(r#"{ "capacity": 1, "shards": 4 }"#);
    assert!(result.is_err());
  }
}
