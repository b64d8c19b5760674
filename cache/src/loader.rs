use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, Thread};

/// The state of a value being loaded.
pub(crate) enum State<V> {
  Loading,
  Loaded(Arc<V>),
  Failed,
}

/// How a load ended, as seen by a waiter.
#[derive(Debug)]
pub(crate) enum LoadOutcome<V> {
  Loaded(Arc<V>),
  /// The leader's loader returned an error or panicked. The error itself is
  /// only handed to the leader.
  Failed,
}

struct Inner<V> {
  state: State<V>,
  waiters: VecDeque<Thread>,
}

/// A one-shot completion handle for a value being computed for the store.
///
/// Exactly one thread (the leader) runs the loader and completes the future;
/// any number of threads may block on it meanwhile.
pub(crate) struct LoadFuture<V> {
  inner: Mutex<Inner<V>>,
}

impl<V> LoadFuture<V> {
  pub(crate) fn new() -> Self {
    Self {
      inner: Mutex::new(Inner {
        state: State::Loading,
        waiters: VecDeque::new(),
      }),
    }
  }

  /// Completes the future with a value, waking all waiters.
  pub(crate) fn complete(&self, value: Arc<V>) {
    self.finish(State::Loaded(value));
  }

  /// Marks the load as failed, waking all waiters.
  pub(crate) fn fail(&self) {
    self.finish(State::Failed);
  }

  pub(crate) fn is_done(&self) -> bool {
    !matches!(self.inner.lock().state, State::Loading)
  }

  fn finish(&self, state: State<V>) {
    let mut inner = self.inner.lock();
    if !matches!(inner.state, State::Loading) {
      return;
    }
    inner.state = state;
    for waiter in inner.waiters.drain(..) {
      waiter.unpark();
    }
  }

  /// Blocks the current thread until the load has finished.
  pub(crate) fn wait(&self) -> LoadOutcome<V> {
    let mut inner = self.inner.lock();
    loop {
      match &inner.state {
        State::Loaded(value) => return LoadOutcome::Loaded(value.clone()),
        State::Failed => return LoadOutcome::Failed,
        State::Loading => {
          inner.waiters.push_back(thread::current());
          // Unlock before parking. A spurious wakeup just loops back here.
          drop(inner);
          thread::park();
          inner = self.inner.lock();
        }
      }
    }
  }
}
