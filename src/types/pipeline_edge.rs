//! A directed edge in the pipeline graph, optionally annotated with a trigger condition.

use serde::{Deserialize, Serialize};

/// Trigger kind recorded on an edge.
///
/// Condition metadata is carried through for the external editor's gating
/// logic; the engine treats every edge as a hard dependency and never
/// evaluates conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
  Always,
  Conditional,
  OnSuccess,
  OnError,
}

/// Condition annotation on an edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeCondition {
  pub kind: ConditionKind,
  /// Free-text expression for `Conditional` edges; opaque to the engine.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub expression: Option<String>,
}

/// A directed edge in the pipeline graph: data flows `source` → `target`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineEdge {
  /// Unique edge id within the graph.
  pub id: String,
  /// Source node id.
  pub source: String,
  /// Target node id.
  pub target: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub condition: Option<EdgeCondition>,
}

impl PipelineEdge {
  /// Creates an unconditioned edge.
  pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      source: source.into(),
      target: target.into(),
      condition: None,
    }
  }
}
