#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sticky_decider_cache::{
  AtomicMetricsSink, DeciderCache, DecisionTask, EvictedError, History, MetricsSink, ReplayEngine,
  StickyMetric, WorkflowExecution,
};

/// A decider that counts how often it was closed.
#[derive(Debug)]
pub struct TestDecider {
  pub run_id: String,
  pub generation: usize,
  closed: AtomicUsize,
}

impl TestDecider {
  pub fn new(run_id: &str, generation: usize) -> Self {
    Self {
      run_id: run_id.to_string(),
      generation,
      closed: AtomicUsize::new(0),
    }
  }

  pub fn close_count(&self) -> usize {
    self.closed.load(Ordering::SeqCst)
  }
}

impl ReplayEngine for TestDecider {
  fn close(&self) {
    self.closed.fetch_add(1, Ordering::SeqCst);
  }
}

/// The error type a task processor would use around the cache.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
  #[error(transparent)]
  Evicted(#[from] EvictedError),
  #[error("failed to build decider: {0}")]
  Factory(String),
}

/// Builds `TestDecider`s and counts the calls.
#[derive(Debug, Clone, Default)]
pub struct Factory {
  calls: Arc<AtomicUsize>,
}

impl Factory {
  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  pub fn create(&self, task: &DecisionTask) -> Result<TestDecider, WorkerError> {
    let generation = self.calls.fetch_add(1, Ordering::SeqCst);
    Ok(TestDecider::new(task.run_id(), generation))
  }
}

pub fn full_history(run_id: &str) -> DecisionTask {
  DecisionTask::new(
    WorkflowExecution::new(format!("wf-{run_id}"), run_id),
    Some(History::from_range(1, 3)),
  )
}

pub fn incremental(run_id: &str) -> DecisionTask {
  DecisionTask::new(
    WorkflowExecution::new(format!("wf-{run_id}"), run_id),
    Some(History::from_range(8, 3)),
  )
}

pub fn build_test_cache(capacity: u64) -> (DeciderCache<TestDecider>, Arc<AtomicMetricsSink>) {
  let sink = Arc::new(AtomicMetricsSink::new());
  let cache = DeciderCache::builder()
    .capacity(capacity)
    .metrics_sink(sink.clone())
    .max_eviction_wait(Duration::from_millis(10))
    .build()
    .unwrap();
  (cache, sink)
}

pub fn admit(
  cache: &DeciderCache<TestDecider>,
  factory: &Factory,
  run_id: &str,
) -> Arc<TestDecider> {
  cache
    .get_or_create(&full_history(run_id), |task| factory.create(task))
    .unwrap()
}

/// A sink that records every call in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
  events: Mutex<Vec<(StickyMetric, u64)>>,
}

impl RecordingSink {
  pub fn events(&self) -> Vec<(StickyMetric, u64)> {
    self.events.lock().clone()
  }

  pub fn count(&self, metric: StickyMetric) -> usize {
    self.events.lock().iter().filter(|(m, _)| *m == metric).count()
  }
}

impl MetricsSink for RecordingSink {
  fn update_gauge(&self, metric: StickyMetric, value: u64) {
    self.events.lock().push((metric, value));
  }

  fn inc_counter(&self, metric: StickyMetric, delta: u64) {
    self.events.lock().push((metric, delta));
  }
}
