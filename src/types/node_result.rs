//! Result of one (node, iteration) execution.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::TokenUsage;

/// Lifecycle of one node result: `Pending → Running → {Completed | Failed}`.
///
/// `Skipped` is a reachable terminal value reserved for nodes intentionally
/// bypassed by external gating logic; the engine itself never produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
  Pending,
  Running,
  Completed,
  Failed,
  Skipped,
}

impl NodeStatus {
  /// Returns true once the status can no longer change for this iteration.
  pub fn is_terminal(&self) -> bool {
    matches!(
      self,
      NodeStatus::Completed | NodeStatus::Failed | NodeStatus::Skipped
    )
  }
}

impl fmt::Display for NodeStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      NodeStatus::Pending => write!(f, "pending"),
      NodeStatus::Running => write!(f, "running"),
      NodeStatus::Completed => write!(f, "completed"),
      NodeStatus::Failed => write!(f, "failed"),
      NodeStatus::Skipped => write!(f, "skipped"),
    }
  }
}

/// Result of one (node, iteration) execution.
///
/// Created in `Pending` state at run start for every node, mutated in place
/// to `Running` then to a terminal state; never deleted during a run.
#[derive(Debug, Clone, Serialize)]
pub struct NodeResult {
  pub node_id: String,
  pub agent_id: String,
  pub agent_name: String,
  /// The resolved prompt fed to this node.
  pub input: String,
  pub output: String,
  pub status: NodeStatus,
  pub start_time: Option<DateTime<Utc>>,
  pub end_time: Option<DateTime<Utc>>,
  pub duration_ms: Option<i64>,
  /// `None` when the backend did not report usage (unmeasured, not zero).
  pub token_usage: Option<TokenUsage>,
  pub error: Option<String>,
  pub level: Option<usize>,
  /// Loop iteration this result belongs to; `None` for non-loop runs.
  pub iteration: Option<u32>,
}

impl NodeResult {
  /// Creates a result in `Pending` state, before any execution begins.
  pub fn pending(
    node_id: impl Into<String>,
    agent_id: impl Into<String>,
    agent_name: impl Into<String>,
  ) -> Self {
    Self {
      node_id: node_id.into(),
      agent_id: agent_id.into(),
      agent_name: agent_name.into(),
      input: String::new(),
      output: String::new(),
      status: NodeStatus::Pending,
      start_time: None,
      end_time: None,
      duration_ms: None,
      token_usage: None,
      error: None,
      level: None,
      iteration: None,
    }
  }
}
