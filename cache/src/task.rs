//! The slice of a polled decision task the sticky cache reads.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The id carried by the first event of every workflow history.
pub const FIRST_EVENT_ID: i64 = 1;

/// Identifies one execution of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct WorkflowExecution {
  pub workflow_id: String,
  pub run_id: String,
}

impl WorkflowExecution {
  pub fn new(workflow_id: impl Into<String>, run_id: impl Into<String>) -> Self {
    Self {
      workflow_id: workflow_id.into(),
      run_id: run_id.into(),
    }
  }
}

/// The kind of a history event. Only the ids matter to the cache; the type is
/// carried for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EventType {
  WorkflowExecutionStarted,
  DecisionTaskScheduled,
  DecisionTaskStarted,
  DecisionTaskCompleted,
  #[default]
  Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct HistoryEvent {
  pub event_id: i64,
  #[cfg_attr(feature = "serde", serde(default))]
  pub event_type: EventType,
}

impl HistoryEvent {
  pub fn new(event_id: i64, event_type: EventType) -> Self {
    Self {
      event_id,
      event_type,
    }
  }
}

/// An ordered fragment of a workflow's event history.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct History {
  pub events: Vec<HistoryEvent>,
}

impl History {
  pub fn new(events: Vec<HistoryEvent>) -> Self {
    Self { events }
  }

  /// A history of `len` consecutive events starting at `first_event_id`.
  pub fn from_range(first_event_id: i64, len: usize) -> Self {
    let events = (first_event_id..)
      .take(len)
      .map(|id| {
        let event_type = if id == FIRST_EVENT_ID {
          EventType::WorkflowExecutionStarted
        } else {
          EventType::Other
        };
        HistoryEvent::new(id, event_type)
      })
      .collect();
    Self { events }
  }

  pub fn first_event_id(&self) -> Option<i64> {
    self.events.first().map(|event| event.event_id)
  }
}

/// A decision task as polled from the service.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DecisionTask {
  pub workflow_execution: WorkflowExecution,
  #[cfg_attr(feature = "serde", serde(default))]
  pub history: Option<History>,
}

impl DecisionTask {
  pub fn new(workflow_execution: WorkflowExecution, history: Option<History>) -> Self {
    Self {
      workflow_execution,
      history,
    }
  }

  pub fn run_id(&self) -> &str {
    &self.workflow_execution.run_id
  }

  /// `true` when the attached history starts at the first event, meaning the
  /// task carries everything needed to build a fresh decider.
  pub fn is_full_history(&self) -> bool {
    self
      .history
      .as_ref()
      .and_then(History::first_event_id)
      .is_some_and(|id| id == FIRST_EVENT_ID)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn task(history: Option<History>) -> DecisionTask {
    DecisionTask::new(WorkflowExecution::new("wf", "run"), history)
  }

  #[test]
  fn history_starting_at_first_event_is_full() {
    assert!(task(Some(History::from_range(1, 3))).is_full_history());
  }

  #[test]
  fn partial_missing_and_empty_histories_are_incremental() {
    assert!(!task(Some(History::from_range(5, 3))).is_full_history());
    assert!(!task(Some(History::default())).is_full_history());
    assert!(!task(None).is_full_history());
  }

  #[test]
  fn from_range_numbers_events_consecutively() {
    let history = History::from_range(4, 3);
    let ids: Vec<i64> = history.events.iter().map(|e| e.event_id).collect();
    assert_eq!(ids, vec![4, 5, 6]);
    assert_eq!(history.first_event_id(), Some(4));
    assert_eq!(
      History::from_range(1, 1).events[0].event_type,
      EventType::WorkflowExecutionStarted
    );
  }

  #[cfg(feature = "serde")]
  #[test]
  fn decodes_polled_task_json() {
    let json = r#"{
      "workflowExecution": { "workflowId": "order-42", "runId": "r-1" },
      "history": { "events": [ { "eventId": 1, "eventType": "WorkflowExecutionStarted" }, { "eventId": 2 } ] }
    }"#;
    let task: DecisionTask = serde_json::from_str(json).unwrap();
    assert_eq!(task.run_id(), "r-1");
    assert!(task.is_full_history());
    assert_eq!(task.history.unwrap().events[1].event_type, EventType::Other);
  }
}
