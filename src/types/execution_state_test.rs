//! Tests for `ExecutionState` and result keying.

use super::{ExecutionState, LoopInfo, RunStatus, result_key};

#[test]
fn result_key_without_iteration_is_bare_id() {
  assert_eq!(result_key("n1", None), "n1");
}

#[test]
fn result_key_iteration_zero_is_bare_id() {
  // Backward compatible with the non-looping case.
  assert_eq!(result_key("n1", Some(0)), "n1");
}

#[test]
fn result_key_later_iterations_are_suffixed() {
  assert_eq!(result_key("n1", Some(1)), "n1__iter1");
  assert_eq!(result_key("n1", Some(9)), "n1__iter9");
}

#[test]
fn started_state_is_running_and_empty() {
  let s = ExecutionState::started(3, None);
  assert_eq!(s.status, RunStatus::Running);
  assert_eq!(s.current_level, 0);
  assert_eq!(s.total_levels, 3);
  assert!(s.results.is_empty());
  assert!(s.active_nodes.is_empty());
  assert!(s.start_time.is_some());
  assert!(s.end_time.is_none());
  assert!(s.final_output.is_none());
  assert!(s.loop_info.is_none());
}

#[test]
fn started_state_carries_loop_info() {
  let s = ExecutionState::started(
    6,
    Some(LoopInfo {
      current_iteration: 0,
      total_iterations: 3,
    }),
  );
  let info = s.loop_info.expect("loop info");
  assert_eq!(info.total_iterations, 3);
}

#[test]
fn run_status_display_is_lowercase() {
  assert_eq!(RunStatus::Idle.to_string(), "idle");
  assert_eq!(RunStatus::Running.to_string(), "running");
  assert_eq!(RunStatus::Completed.to_string(), "completed");
  assert_eq!(RunStatus::Failed.to_string(), "failed");
}
