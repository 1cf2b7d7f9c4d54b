//! Token usage reported by a text-generation backend for one invocation.

use serde::{Deserialize, Serialize};

/// Token usage reported by a text-generation backend for one invocation.
///
/// Backends that do not report usage yield `None` at the call site rather
/// than a zeroed value, so "unmeasured" stays distinguishable from "free".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
  pub prompt: u32,
  pub completion: u32,
  pub total: u32,
}
