mod common;

use common::{admit, build_test_cache, Factory, TestDecider};
use sticky_decider_cache::{DeciderCache, RemovalCause};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

#[test]
fn third_run_evicts_least_recently_used() {
  let (cache, _sink) = build_test_cache(2);
  let factory = Factory::default();

  let a = admit(&cache, &factory, "A");
  let b = admit(&cache, &factory, "B");
  assert_eq!(cache.size(), 2);

  let c = admit(&cache, &factory, "C");

  assert!(cache.size() <= 2);
  assert_eq!(a.close_count(), 1, "evicted decider is closed");
  assert_eq!(b.close_count(), 0);
  assert_eq!(c.close_count(), 0);

  let err = cache.get_unchecked("A").unwrap_err();
  assert_eq!(err.run_id(), "A");
  assert!(cache.get_unchecked("B").is_ok());
  assert!(cache.get_unchecked("C").is_ok());
  assert_eq!(cache.store_stats().evicted_by_capacity, 1);
}

#[test]
fn lookups_refresh_recency() {
  let (cache, _sink) = build_test_cache(2);
  let factory = Factory::default();

  let a = admit(&cache, &factory, "A");
  let b = admit(&cache, &factory, "B");
  cache.get_unchecked("A").unwrap();

  admit(&cache, &factory, "C");

  assert_eq!(a.close_count(), 0);
  assert_eq!(b.close_count(), 1);
  assert!(cache.contains("A"));
  assert!(!cache.contains("B"));
}

#[test]
fn contains_does_not_refresh_recency() {
  let (cache, _sink) = build_test_cache(2);
  let factory = Factory::default();

  let a = admit(&cache, &factory, "A");
  admit(&cache, &factory, "B");
  assert!(cache.contains("A"));

  admit(&cache, &factory, "C");
  assert_eq!(a.close_count(), 1);
}

#[test]
fn evict_next_frees_one_slot_from_a_full_cache() {
  let (cache, sink) = build_test_cache(3);
  let factory = Factory::default();
  let deciders: Vec<_> = ["a", "b", "c"]
    .iter()
    .map(|run_id| admit(&cache, &factory, run_id))
    .collect();

  cache.evict_next();

  assert_eq!(cache.size(), 2);
  assert!(cache.weighted_size() <= cache.capacity());
  assert_eq!(deciders[0].close_count(), 1, "oldest run goes first");
  assert_eq!(deciders[1].close_count(), 0);
  assert_eq!(deciders[2].close_count(), 0);

  let snapshot = sink.snapshot();
  assert_eq!(snapshot.thread_forced_evictions, 1);
  assert_eq!(snapshot.cache_size, 3, "size is reported before evicting");
}

#[test]
fn evict_next_with_free_space_still_evicts_one_run() {
  let (cache, _sink) = build_test_cache(5);
  let factory = Factory::default();
  let a = admit(&cache, &factory, "a");
  let b = admit(&cache, &factory, "b");

  cache.evict_next();

  assert_eq!(cache.size(), 1);
  assert_eq!(a.close_count(), 1);
  assert_eq!(b.close_count(), 0);
  assert_eq!(cache.weighted_size(), 1);
}

#[test]
fn repeated_evict_next_drains_the_cache() {
  let (cache, _sink) = build_test_cache(4);
  let factory = Factory::default();
  let deciders: Vec<_> = (0..4)
    .map(|i| admit(&cache, &factory, &format!("run-{i}")))
    .collect();

  for expected in (0..4).rev() {
    cache.evict_next();
    assert_eq!(cache.size(), expected);
    assert!(cache.weighted_size() <= cache.capacity());
  }
  cache.evict_next();
  assert_eq!(cache.size(), 0);

  assert!(deciders.iter().all(|d| d.close_count() == 1));
}

#[test]
fn every_removal_path_closes_exactly_once() {
  let (cache, _sink) = build_test_cache(2);
  let factory = Factory::default();

  // capacity eviction
  let evicted = admit(&cache, &factory, "a");
  admit(&cache, &factory, "b");
  admit(&cache, &factory, "c");

  // forced eviction
  let forced = cache.get_unchecked("b").unwrap();
  cache.get_unchecked("c").unwrap();
  cache.evict_next();

  // explicit invalidation
  let invalidated = cache.get_unchecked("c").unwrap();
  cache.invalidate_run("c");
  cache.invalidate_run("c");

  // bulk clear
  let cleared = admit(&cache, &factory, "d");
  cache.invalidate_all();
  cache.invalidate_all();

  for decider in [&evicted, &forced, &invalidated, &cleared] {
    assert_eq!(decider.close_count(), 1, "run {} closed once", decider.run_id);
  }
  assert_eq!(cache.size(), 0);
}

#[test]
fn removal_listener_sees_capacity_evictions_but_not_the_sentinel() {
  let seen: Arc<Mutex<Vec<(String, RemovalCause)>>> = Arc::new(Mutex::new(Vec::new()));
  let log = seen.clone();
  let cache = DeciderCache::<TestDecider>::builder()
    .capacity(1)
    .max_eviction_wait(Duration::ZERO)
    .removal_listener(move |run_id: String, decider: Option<Arc<TestDecider>>, cause: RemovalCause| {
      let decider = decider.expect("observers only see real deciders");
      assert_eq!(decider.close_count(), 1, "closed before observers run");
      log.lock().push((run_id, cause));
    })
    .build()
    .unwrap();
  let factory = Factory::default();

  admit(&cache, &factory, "a");
  admit(&cache, &factory, "b");
  cache.evict_next();
  cache.evict_next();

  assert_eq!(
    seen.lock().as_slice(),
    &[
      ("a".to_string(), RemovalCause::Capacity),
      ("b".to_string(), RemovalCause::Capacity),
    ]
  );
}
