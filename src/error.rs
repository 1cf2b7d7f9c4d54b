//! Structural errors surfaced from the run entry point and level computation.
//!
//! Per-node failures (unknown agent, backend errors) are never represented
//! here; they are absorbed into the affected [crate::types::NodeResult] and
//! the run continues.

use thiserror::Error;

/// Structural errors: the run never starts (or no levels are produced) when
/// one of these is returned.
#[derive(Debug, Error)]
pub enum PipelineError {
  /// Levels cannot be computed for a cyclic graph. Confirm the back edges as
  /// a bounded loop or remove them before running.
  #[error("pipeline graph contains a cycle; levels cannot be computed")]
  CyclicGraph,

  /// The caller's loop configuration did not name every back edge, so a
  /// cycle survived removal. This is a configuration error; nothing was
  /// executed.
  #[error("pipeline graph still contains a cycle after removing {removed} back edge(s)")]
  CycleAfterBackEdgeRemoval {
    /// Number of back edge ids that were stripped before the check.
    removed: usize,
  },
}
