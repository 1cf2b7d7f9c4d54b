//! Tests for `LoopConfig`.

use super::LoopConfig;

#[test]
fn bounded_iterations_passes_values_in_range() {
  let cfg = LoopConfig {
    back_edge_ids: vec!["e9".to_string()],
    iterations: 3,
  };
  assert_eq!(cfg.bounded_iterations(), 3);
}

#[test]
fn bounded_iterations_clamps_zero_to_one() {
  let cfg = LoopConfig {
    back_edge_ids: vec![],
    iterations: 0,
  };
  assert_eq!(cfg.bounded_iterations(), 1);
}

#[test]
fn bounded_iterations_clamps_above_maximum() {
  let cfg = LoopConfig {
    back_edge_ids: vec![],
    iterations: 50,
  };
  assert_eq!(cfg.bounded_iterations(), 10);
}

#[test]
fn deserializes_from_json() {
  let cfg: LoopConfig =
    serde_json::from_str(r#"{ "back_edge_ids": ["e1", "e2"], "iterations": 5 }"#).unwrap();
  assert_eq!(cfg.back_edge_ids, vec!["e1", "e2"]);
  assert_eq!(cfg.iterations, 5);
}
