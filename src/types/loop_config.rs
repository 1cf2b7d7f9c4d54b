//! User-confirmed authorization to run a cyclic graph as a bounded loop.

use serde::{Deserialize, Serialize};

/// Minimum loop iteration count.
pub const MIN_ITERATIONS: u32 = 1;
/// Maximum loop iteration count.
pub const MAX_ITERATIONS: u32 = 10;

/// User-confirmed authorization to treat specific edges as loop-closing
/// rather than as a hard error. Supplied only when the raw graph contains a
/// cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
  /// Edge ids stripped from the edge set to obtain the acyclic core.
  pub back_edge_ids: Vec<String>,
  /// Requested iteration count; see [LoopConfig::bounded_iterations].
  pub iterations: u32,
}

impl LoopConfig {
  /// Iteration count clamped to the supported 1..=10 range.
  pub fn bounded_iterations(&self) -> u32 {
    self.iterations.clamp(MIN_ITERATIONS, MAX_ITERATIONS)
  }
}
