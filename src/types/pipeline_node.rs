//! A node in the pipeline graph: one agent invocation step.

use serde::{Deserialize, Serialize};

/// A node in the pipeline graph: one agent invocation step.
///
/// Nodes are created by the external editor before a run starts and are
/// immutable during execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineNode {
  /// Unique node id within the graph.
  pub id: String,
  /// Opaque key resolved externally to an [super::AgentConfig].
  pub agent_id: String,
}

impl PipelineNode {
  pub fn new(id: impl Into<String>, agent_id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      agent_id: agent_id.into(),
    }
  }
}
