//! Resolved agent configuration, supplied fresh at run start.

use serde::{Deserialize, Serialize};

/// Resolved agent configuration, supplied fresh at run start by the external
/// editor/settings subsystem. The engine only reads these; credentials are
/// managed elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
  pub id: String,
  /// Display name, quoted in context blocks and the final output.
  pub name: String,
  #[serde(default)]
  pub system_prompt: String,
  /// Backend provider key (e.g. `openai`, `anthropic`, `googleai`, `mistral`).
  pub provider: String,
  pub model_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub api_key: Option<String>,
}
