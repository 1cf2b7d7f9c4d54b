//! One level of the topological ordering: nodes runnable in parallel.

use serde::Serialize;

/// One level of the topological ordering: nodes runnable in parallel.
///
/// Every node's predecessors live in strictly earlier levels; nodes within a
/// level carry no ordering guarantee among themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionLevel {
  /// Zero-based depth of this level.
  pub level: usize,
  /// Node ids eligible to run in parallel at this depth.
  pub node_ids: Vec<String>,
}
