//! Pipeline engine types: the graph shape supplied by the external editor and
//! the run state mutated by the execution engine.
//!
//! All graph inputs are plain serde data so saved pipelines round-trip as JSON.

use std::collections::HashMap;

mod agent_config;
mod cycle_info;
mod execution_level;
mod execution_state;
#[cfg(test)]
mod execution_state_test;
mod loop_config;
#[cfg(test)]
mod loop_config_test;
mod node_result;
mod pipeline_edge;
mod pipeline_node;
mod token_usage;

pub use agent_config::AgentConfig;
pub use cycle_info::CycleInfo;
pub use execution_level::ExecutionLevel;
pub use execution_state::{ExecutionState, LoopInfo, RunStatus, result_key};
pub use loop_config::{LoopConfig, MAX_ITERATIONS, MIN_ITERATIONS};
pub use node_result::{NodeResult, NodeStatus};
pub use pipeline_edge::{ConditionKind, EdgeCondition, PipelineEdge};
pub use pipeline_node::PipelineNode;
pub use token_usage::TokenUsage;

/// Read-only lookup from a node's `agent_id` to its resolved configuration,
/// supplied fresh at run start.
pub type AgentMap = HashMap<String, AgentConfig>;
