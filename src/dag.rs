//! Graph resolution: cycle detection, back-edge identification, and
//! topological leveling for parallel execution.
//!
//! Callers MUST verify acyclicity (via [has_cycle] or [detect_cycles]) before
//! asking for levels; [topological_levels] refuses cyclic graphs rather than
//! returning a partial ordering.

use std::collections::{HashMap, HashSet};

use tracing::{instrument, trace};

use crate::error::PipelineError;
use crate::types::{CycleInfo, ExecutionLevel, PipelineEdge, PipelineNode};

/// Builds the forward adjacency list. Edges whose source is not a known node
/// are ignored, matching the editor's own dangling-edge tolerance.
fn adjacency<'a>(
  nodes: &'a [PipelineNode],
  edges: &'a [PipelineEdge],
) -> HashMap<&'a str, Vec<&'a str>> {
  let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
  for n in nodes {
    adj.insert(n.id.as_str(), Vec::new());
  }
  for e in edges {
    if let Some(targets) = adj.get_mut(e.source.as_str()) {
      targets.push(e.target.as_str());
    }
  }
  adj
}

fn has_cycle_from(
  node_id: &str,
  adj: &HashMap<&str, Vec<&str>>,
  visited: &mut HashSet<String>,
  on_stack: &mut HashSet<String>,
) -> bool {
  visited.insert(node_id.to_string());
  on_stack.insert(node_id.to_string());
  for &next in adj.get(node_id).map(Vec::as_slice).unwrap_or(&[]) {
    if on_stack.contains(next) {
      return true;
    }
    if !visited.contains(next) && has_cycle_from(next, adj, visited, on_stack) {
      return true;
    }
  }
  on_stack.remove(node_id);
  false
}

/// Returns true if the graph contains any directed cycle. Short-circuits on
/// the first cycle found; use [detect_cycles] for the full picture.
#[instrument(level = "trace", skip_all)]
pub fn has_cycle(nodes: &[PipelineNode], edges: &[PipelineEdge]) -> bool {
  let adj = adjacency(nodes, edges);
  let mut visited = HashSet::new();
  let mut on_stack = HashSet::new();
  for n in nodes {
    if !visited.contains(n.id.as_str()) && has_cycle_from(&n.id, &adj, &mut visited, &mut on_stack)
    {
      return true;
    }
  }
  false
}

fn collect_cycles_from(
  node_id: &str,
  adj: &HashMap<&str, Vec<&str>>,
  visited: &mut HashSet<String>,
  on_stack: &mut HashSet<String>,
  path: &mut Vec<String>,
  back_pairs: &mut HashSet<(String, String)>,
  cycle_nodes: &mut Vec<String>,
) {
  visited.insert(node_id.to_string());
  on_stack.insert(node_id.to_string());
  path.push(node_id.to_string());

  for &next in adj.get(node_id).map(Vec::as_slice).unwrap_or(&[]) {
    if on_stack.contains(next) {
      // An edge to a node still on the DFS stack closes a cycle. Every node
      // on the current path from that target onward participates in it.
      back_pairs.insert((node_id.to_string(), next.to_string()));
      if let Some(start) = path.iter().position(|p| p == next) {
        for p in &path[start..] {
          if !cycle_nodes.contains(p) {
            cycle_nodes.push(p.clone());
          }
        }
      }
    } else if !visited.contains(next) {
      collect_cycles_from(next, adj, visited, on_stack, path, back_pairs, cycle_nodes);
    }
  }

  path.pop();
  on_stack.remove(node_id);
}

/// Finds every back edge and every cycle participant in one pass, restarting
/// from each unvisited node so disconnected components and independent cycles
/// are all discovered.
///
/// Returns `None` when the graph is acyclic, so callers can distinguish
/// "acyclic" from "cyclic" without inspecting the edge list. A self-loop is a
/// cycle of size one and falls out of the same traversal.
#[instrument(level = "trace", skip_all)]
pub fn detect_cycles(nodes: &[PipelineNode], edges: &[PipelineEdge]) -> Option<CycleInfo> {
  let adj = adjacency(nodes, edges);
  let mut visited = HashSet::new();
  let mut on_stack = HashSet::new();
  let mut path = Vec::new();
  let mut back_pairs = HashSet::new();
  let mut cycle_nodes = Vec::new();

  for n in nodes {
    if !visited.contains(n.id.as_str()) {
      collect_cycles_from(
        &n.id,
        &adj,
        &mut visited,
        &mut on_stack,
        &mut path,
        &mut back_pairs,
        &mut cycle_nodes,
      );
    }
  }

  if back_pairs.is_empty() {
    return None;
  }

  let back_edges = edges
    .iter()
    .filter(|e| back_pairs.contains(&(e.source.clone(), e.target.clone())))
    .cloned()
    .collect();
  trace!(back_pairs = back_pairs.len(), "cycles detected");
  Some(CycleInfo {
    back_edges,
    cycle_nodes,
  })
}

/// Filters out the edges named in `back_edge_ids`, yielding the acyclic core
/// of a user-confirmed loop.
pub fn remove_back_edges(edges: &[PipelineEdge], back_edge_ids: &[String]) -> Vec<PipelineEdge> {
  edges
    .iter()
    .filter(|e| !back_edge_ids.contains(&e.id))
    .cloned()
    .collect()
}

/// Nodes with no incoming edge.
pub fn find_root_nodes(nodes: &[PipelineNode], edges: &[PipelineEdge]) -> Vec<String> {
  let targets: HashSet<&str> = edges.iter().map(|e| e.target.as_str()).collect();
  nodes
    .iter()
    .filter(|n| !targets.contains(n.id.as_str()))
    .map(|n| n.id.clone())
    .collect()
}

/// Nodes with no outgoing edge.
pub fn find_leaf_nodes(nodes: &[PipelineNode], edges: &[PipelineEdge]) -> Vec<String> {
  let sources: HashSet<&str> = edges.iter().map(|e| e.source.as_str()).collect();
  nodes
    .iter()
    .filter(|n| !sources.contains(n.id.as_str()))
    .map(|n| n.id.clone())
    .collect()
}

/// Partitions an acyclic graph into ordered levels (Kahn's level-BFS): level 0
/// holds every node with in-degree 0, and each later level holds the nodes
/// whose remaining in-degree reaches 0 once the previous level is retired.
///
/// Errors on a cyclic graph instead of returning a partial result.
#[instrument(level = "trace", skip_all)]
pub fn topological_levels(
  nodes: &[PipelineNode],
  edges: &[PipelineEdge],
) -> Result<Vec<ExecutionLevel>, PipelineError> {
  if has_cycle(nodes, edges) {
    return Err(PipelineError::CyclicGraph);
  }

  let adj = adjacency(nodes, edges);
  let mut in_degree: HashMap<&str, usize> = nodes.iter().map(|n| (n.id.as_str(), 0)).collect();
  for e in edges {
    if let Some(d) = in_degree.get_mut(e.target.as_str()) {
      *d += 1;
    }
  }

  let mut levels = Vec::new();
  let mut queue: Vec<&str> = nodes
    .iter()
    .map(|n| n.id.as_str())
    .filter(|id| in_degree[id] == 0)
    .collect();
  let mut level = 0;

  while !queue.is_empty() {
    levels.push(ExecutionLevel {
      level,
      node_ids: queue.iter().map(|id| id.to_string()).collect(),
    });
    let mut next_queue = Vec::new();
    for id in &queue {
      for &next in adj.get(id).map(Vec::as_slice).unwrap_or(&[]) {
        let d = in_degree.entry(next).or_insert(0);
        *d = d.saturating_sub(1);
        if *d == 0 {
          next_queue.push(next);
        }
      }
    }
    queue = next_queue;
    level += 1;
  }

  trace!(levels = levels.len(), "levels computed");
  Ok(levels)
}

/// Source ids of every edge pointing at `node_id`, in edge order. Plain edge
/// filter; operates on whichever edge set the caller passes (raw or cleaned).
pub fn predecessors(node_id: &str, edges: &[PipelineEdge]) -> Vec<String> {
  edges
    .iter()
    .filter(|e| e.target == node_id)
    .map(|e| e.source.clone())
    .collect()
}

/// Target ids of every edge leaving `node_id`, in edge order.
pub fn successors(node_id: &str, edges: &[PipelineEdge]) -> Vec<String> {
  edges
    .iter()
    .filter(|e| e.source == node_id)
    .map(|e| e.target.clone())
    .collect()
}
