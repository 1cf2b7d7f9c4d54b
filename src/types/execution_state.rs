//! Aggregate state of one pipeline run.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::NodeResult;

/// Overall run status: `Idle → Running → {Completed | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
  Idle,
  Running,
  Completed,
  Failed,
}

impl fmt::Display for RunStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RunStatus::Idle => write!(f, "idle"),
      RunStatus::Running => write!(f, "running"),
      RunStatus::Completed => write!(f, "completed"),
      RunStatus::Failed => write!(f, "failed"),
    }
  }
}

/// Progress through a bounded loop; present only when iterations > 1.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LoopInfo {
  pub current_iteration: u32,
  pub total_iterations: u32,
}

/// Aggregate state of one pipeline run.
///
/// Created once per run invocation, mutated throughout, discarded (or
/// replaced) at the next run. Progress callbacks receive full clones of this
/// as self-consistent snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionState {
  pub run_id: Uuid,
  pub status: RunStatus,
  pub current_level: usize,
  /// Level count × iteration count.
  pub total_levels: usize,
  /// Result per (node, iteration), addressed by [result_key].
  pub results: HashMap<String, NodeResult>,
  /// Node ids currently in flight.
  pub active_nodes: HashSet<String>,
  pub start_time: Option<DateTime<Utc>>,
  pub end_time: Option<DateTime<Utc>>,
  /// Synthesized from the last level's results of the last iteration.
  pub final_output: Option<String>,
  pub loop_info: Option<LoopInfo>,
}

impl ExecutionState {
  /// Creates a fresh `Running` state with no results yet.
  pub fn started(total_levels: usize, loop_info: Option<LoopInfo>) -> Self {
    Self {
      run_id: Uuid::new_v4(),
      status: RunStatus::Running,
      current_level: 0,
      total_levels,
      results: HashMap::new(),
      active_nodes: HashSet::new(),
      start_time: Some(Utc::now()),
      end_time: None,
      final_output: None,
      loop_info,
    }
  }
}

/// Key addressing one [NodeResult] in the results map.
///
/// Iteration 0 (and non-loop runs) use the bare node id so the non-looping
/// case keeps its historical keying.
pub fn result_key(node_id: &str, iteration: Option<u32>) -> String {
  match iteration {
    Some(i) if i > 0 => format!("{node_id}__iter{i}"),
    _ => node_id.to_string(),
  }
}
