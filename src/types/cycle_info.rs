//! Detail about cycles found in a pipeline graph.

use super::PipelineEdge;

/// Detail about cycles found in a pipeline graph.
///
/// Returned by [crate::dag::detect_cycles] only when at least one cycle
/// exists, so callers can distinguish "acyclic" from "cyclic" without
/// inspecting the edge list.
#[derive(Debug, Clone)]
pub struct CycleInfo {
  /// The edges that close each cycle; removing all of them yields an
  /// acyclic graph.
  pub back_edges: Vec<PipelineEdge>,
  /// Ids of every node participating in a cycle.
  pub cycle_nodes: Vec<String>,
}
