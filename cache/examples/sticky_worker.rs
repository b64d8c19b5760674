use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use sticky_decider_cache::{
  AtomicMetricsSink, DeciderCache, DeciderCacheBuilder, DecisionTask, EvictedError, History,
  ReplayEngine, RemovalCause, StickyCacheConfig, WorkflowExecution,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// A stand-in for a real replay decider.
struct Decider {
  run_id: String,
  replayed_events: usize,
}

impl ReplayEngine for Decider {
  fn close(&self) {
    info!(run_id = %self.run_id, "decider closed");
  }
}

#[derive(Debug, thiserror::Error)]
enum PollError {
  #[error(transparent)]
  Evicted(#[from] EvictedError),
}

fn task(run_id: &str, first_event_id: i64) -> DecisionTask {
  DecisionTask::new(
    WorkflowExecution::new("order-workflow", run_id),
    Some(History::from_range(first_event_id, 4)),
  )
}

fn process(
  cache: &DeciderCache<Decider>,
  builds: &AtomicUsize,
  task: &DecisionTask,
) -> Result<(), PollError> {
  let decider = cache.get_or_create(task, |task| {
    builds.fetch_add(1, Ordering::Relaxed);
    Ok::<_, PollError>(Decider {
      run_id: task.run_id().to_string(),
      replayed_events: task.history.as_ref().map_or(0, |h| h.events.len()),
    })
  })?;
  info!(
    run_id = %decider.run_id,
    replayed = decider.replayed_events,
    "decision task handled"
  );
  Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  // A worker would read this from its own configuration file.
  let config: StickyCacheConfig =
    serde_json::from_str(r#"{ "capacity": 3, "max_eviction_wait_ms": 50 }"#)?;

  let sink = Arc::new(AtomicMetricsSink::new());
  let cache = Arc::new(
    DeciderCacheBuilder::from_config(&config)
      .metrics_sink(sink.clone())
      .removal_listener(|run_id: String, _decider: Option<Arc<Decider>>, cause: RemovalCause| {
        info!(%run_id, %cause, "run left the sticky cache");
      })
      .build()?,
  );
  let builds = Arc::new(AtomicUsize::new(0));

  // Four pollers each own a run: a full-history task followed by incremental ones.
  let pollers: Vec<_> = (0..4)
    .map(|i| {
      let cache = cache.clone();
      let builds = builds.clone();
      thread::spawn(move || {
        let run_id = format!("run-{i}");
        for first_event_id in [1, 5, 9] {
          if let Err(err) = process(&cache, &builds, &task(&run_id, first_event_id)) {
            // An evicted run is recovered by polling its full history again.
            warn!(%err, "sticky task missed, replaying full history");
            if let Err(err) = process(&cache, &builds, &task(&run_id, 1)) {
              warn!(%err, "full history replay failed");
            }
          }
        }
      })
    })
    .collect();
  for poller in pollers {
    if poller.join().is_err() {
      warn!("poller thread panicked");
    }
  }

  // Memory pressure: give one slot back.
  cache.evict_next();

  info!(
    size = cache.size(),
    builds = builds.load(Ordering::Relaxed),
    "workers finished"
  );
  println!("\nMetrics: {:#?}", sink.snapshot());
  println!("Store stats: {:#?}", cache.store_stats());

  cache.invalidate_all();
  Ok(())
}
