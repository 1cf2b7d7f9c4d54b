//! Tests for `dag`.

use std::collections::HashMap;

use proptest::prelude::*;

use crate::dag::{
  detect_cycles, find_leaf_nodes, find_root_nodes, has_cycle, predecessors, remove_back_edges,
  successors, topological_levels,
};
use crate::error::PipelineError;
use crate::types::{PipelineEdge, PipelineNode};

fn nodes(ids: &[&str]) -> Vec<PipelineNode> {
  ids
    .iter()
    .map(|id| PipelineNode::new(*id, format!("agent-{id}")))
    .collect()
}

fn edges(pairs: &[(&str, &str)]) -> Vec<PipelineEdge> {
  pairs
    .iter()
    .enumerate()
    .map(|(i, (s, t))| PipelineEdge::new(format!("e{i}"), *s, *t))
    .collect()
}

#[test]
fn empty_graph_has_no_cycle() {
  assert!(!has_cycle(&[], &[]));
  assert!(detect_cycles(&[], &[]).is_none());
}

#[test]
fn linear_chain_is_acyclic() {
  let n = nodes(&["a", "b", "c"]);
  let e = edges(&[("a", "b"), ("b", "c")]);
  assert!(!has_cycle(&n, &e));
  assert!(detect_cycles(&n, &e).is_none());
}

#[test]
fn diamond_is_acyclic() {
  let n = nodes(&["a", "b", "c", "d"]);
  let e = edges(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
  assert!(!has_cycle(&n, &e));
}

#[test]
fn two_node_cycle_is_detected() {
  let n = nodes(&["a", "b"]);
  let e = edges(&[("a", "b"), ("b", "a")]);
  assert!(has_cycle(&n, &e));
  let info = detect_cycles(&n, &e).expect("cycle");
  assert_eq!(info.back_edges.len(), 1);
  assert_eq!(info.cycle_nodes.len(), 2);
  assert!(info.cycle_nodes.contains(&"a".to_string()));
  assert!(info.cycle_nodes.contains(&"b".to_string()));
}

#[test]
fn self_loop_is_a_cycle_of_size_one() {
  let n = nodes(&["a"]);
  let e = edges(&[("a", "a")]);
  assert!(has_cycle(&n, &e));
  let info = detect_cycles(&n, &e).expect("cycle");
  assert_eq!(info.back_edges.len(), 1);
  assert_eq!(info.back_edges[0].source, "a");
  assert_eq!(info.back_edges[0].target, "a");
  assert_eq!(info.cycle_nodes, vec!["a".to_string()]);
}

#[test]
fn independent_cycles_in_disconnected_components_are_all_reported() {
  let n = nodes(&["a", "b", "x", "y"]);
  let e = edges(&[("a", "b"), ("b", "a"), ("x", "y"), ("y", "x")]);
  let info = detect_cycles(&n, &e).expect("cycles");
  assert_eq!(info.back_edges.len(), 2);
  assert_eq!(info.cycle_nodes.len(), 4);
}

#[test]
fn removing_reported_back_edges_yields_acyclic_graph() {
  let n = nodes(&["a", "b", "c"]);
  // a -> b -> c -> a plus a self-loop on b.
  let e = edges(&[("a", "b"), ("b", "c"), ("c", "a"), ("b", "b")]);
  let info = detect_cycles(&n, &e).expect("cycles");
  assert!(!info.back_edges.is_empty());
  let ids: Vec<String> = info.back_edges.iter().map(|e| e.id.clone()).collect();
  let clean = remove_back_edges(&e, &ids);
  assert!(!has_cycle(&n, &clean));
  assert!(detect_cycles(&n, &clean).is_none());
}

#[test]
fn has_cycle_agrees_with_detect_cycles() {
  let acyclic = (
    nodes(&["a", "b", "c"]),
    edges(&[("a", "b"), ("a", "c")]),
  );
  let cyclic = (
    nodes(&["a", "b", "c"]),
    edges(&[("a", "b"), ("b", "c"), ("c", "b")]),
  );
  assert_eq!(
    has_cycle(&acyclic.0, &acyclic.1),
    detect_cycles(&acyclic.0, &acyclic.1).is_some()
  );
  assert_eq!(
    has_cycle(&cyclic.0, &cyclic.1),
    detect_cycles(&cyclic.0, &cyclic.1).is_some()
  );
}

#[test]
fn remove_back_edges_filters_by_id() {
  let e = edges(&[("a", "b"), ("b", "a")]);
  let clean = remove_back_edges(&e, &["e1".to_string()]);
  assert_eq!(clean.len(), 1);
  assert_eq!(clean[0].id, "e0");
}

#[test]
fn roots_and_leaves() {
  let n = nodes(&["a", "b", "c", "d"]);
  let e = edges(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
  assert_eq!(find_root_nodes(&n, &e), vec!["a".to_string()]);
  assert_eq!(find_leaf_nodes(&n, &e), vec!["d".to_string()]);
}

#[test]
fn chain_levels_are_one_node_each() {
  let n = nodes(&["a", "b", "c"]);
  let e = edges(&[("a", "b"), ("b", "c")]);
  let levels = topological_levels(&n, &e).unwrap();
  assert_eq!(levels.len(), 3);
  assert_eq!(levels[0].node_ids, vec!["a".to_string()]);
  assert_eq!(levels[1].node_ids, vec!["b".to_string()]);
  assert_eq!(levels[2].node_ids, vec!["c".to_string()]);
}

#[test]
fn diamond_levels_put_middle_nodes_together() {
  let n = nodes(&["a", "b", "c", "d"]);
  let e = edges(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
  let levels = topological_levels(&n, &e).unwrap();
  assert_eq!(levels.len(), 3);
  assert_eq!(levels[0].node_ids, vec!["a".to_string()]);
  let mut mid = levels[1].node_ids.clone();
  mid.sort();
  assert_eq!(mid, vec!["b".to_string(), "c".to_string()]);
  assert_eq!(levels[2].node_ids, vec!["d".to_string()]);
  assert_eq!(levels[1].level, 1);
}

#[test]
fn disconnected_nodes_share_level_zero() {
  let n = nodes(&["a", "b"]);
  let levels = topological_levels(&n, &[]).unwrap();
  assert_eq!(levels.len(), 1);
  assert_eq!(levels[0].node_ids.len(), 2);
}

#[test]
fn levels_refuse_cyclic_graph() {
  let n = nodes(&["a", "b"]);
  let e = edges(&[("a", "b"), ("b", "a")]);
  let err = topological_levels(&n, &e).unwrap_err();
  assert!(matches!(err, PipelineError::CyclicGraph));
}

#[test]
fn predecessors_and_successors_are_plain_edge_filters() {
  let e = edges(&[("a", "d"), ("b", "d"), ("d", "c")]);
  assert_eq!(
    predecessors("d", &e),
    vec!["a".to_string(), "b".to_string()]
  );
  assert_eq!(successors("d", &e), vec!["c".to_string()]);
  assert!(predecessors("a", &e).is_empty());
  assert!(successors("c", &e).is_empty());
}

/// Random DAG: node i may only point at node j when i < j, so the graph is
/// acyclic by construction.
fn arb_dag() -> impl Strategy<Value = (Vec<PipelineNode>, Vec<PipelineEdge>)> {
  (2usize..12).prop_flat_map(|n| {
    let pairs = proptest::collection::vec((0..n, 0..n), 0..24);
    pairs.prop_map(move |raw| {
      let node_list: Vec<PipelineNode> = (0..n)
        .map(|i| PipelineNode::new(format!("n{i}"), "agent"))
        .collect();
      let edge_list: Vec<PipelineEdge> = raw
        .into_iter()
        .filter(|(s, t)| s < t)
        .enumerate()
        .map(|(i, (s, t))| PipelineEdge::new(format!("e{i}"), format!("n{s}"), format!("n{t}")))
        .collect();
      (node_list, edge_list)
    })
  })
}

proptest! {
  #[test]
  fn levels_partition_nodes_and_respect_edge_order((n, e) in arb_dag()) {
    prop_assert!(!has_cycle(&n, &e));
    let levels = topological_levels(&n, &e).unwrap();

    let mut level_of: HashMap<String, usize> = HashMap::new();
    for l in &levels {
      for id in &l.node_ids {
        // every node appears in exactly one level
        prop_assert!(level_of.insert(id.clone(), l.level).is_none());
      }
    }
    prop_assert_eq!(level_of.len(), n.len());

    for edge in &e {
      prop_assert!(level_of[&edge.source] < level_of[&edge.target]);
    }
  }
}
