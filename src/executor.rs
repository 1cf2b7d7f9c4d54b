//! Pipeline execution engine: drives a run level by level, with fan-out
//! concurrency scoped to one level at a time.
//!
//! A run executes the acyclic core once, or — when the user has confirmed a
//! [LoopConfig] — repeats the full level-by-level pass a bounded number of
//! iterations, threading each iteration's outputs into the next. Node
//! failures are absorbed into the affected [NodeResult] and surface only in
//! whatever reads its output; only structural errors (and an externally
//! requested abort) end a run without a final output.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::dag;
use crate::error::PipelineError;
use crate::invoker::StepInvoker;
use crate::types::{
  AgentMap, ExecutionState, LoopInfo, NodeResult, NodeStatus, PipelineEdge, PipelineNode,
  RunStatus, result_key,
};

/// Separator between predecessor context blocks and between final-output parts.
const BLOCK_SEPARATOR: &str = "\n\n---\n\n";
/// Fixed trailing instruction appended to every assembled context.
const TRAILING_INSTRUCTION: &str = "\n\n---\nAct on the context above directly.";

/// Progress callback, invoked after every meaningful state change (node
/// start, node completion, node failure, level advance) with a full,
/// self-consistent snapshot. Called from concurrently running node tasks, so
/// implementations must tolerate concurrent calls.
pub type ExecutionCallback = Arc<dyn Fn(&ExecutionState) + Send + Sync>;

/// Options for [run_pipeline].
#[derive(Default)]
pub struct RunOptions {
  /// Confirmed back edges and iteration count; required when the raw graph
  /// contains a cycle.
  pub loop_config: Option<crate::types::LoopConfig>,
  /// Run-level abort flag, checked between levels and iterations only.
  /// In-flight node invocations always run to completion.
  pub abort: Option<Arc<AtomicBool>>,
}

/// Runs the whole graph once (no loop) or for a bounded number of loop
/// iterations. The sole public run operation of the engine.
///
/// Structural errors (a cycle surviving back-edge removal) are returned
/// before any node executes. Per-node failures never abort the run; the
/// returned state distinguishes `Completed` from `Failed` per node and per
/// iteration.
#[instrument(level = "trace", skip_all, fields(nodes = nodes.len(), edges = edges.len()))]
pub async fn run_pipeline(
  nodes: &[PipelineNode],
  edges: &[PipelineEdge],
  agents: &AgentMap,
  initial_input: &str,
  invoker: Arc<dyn StepInvoker>,
  on_update: ExecutionCallback,
  options: RunOptions,
) -> Result<ExecutionState, PipelineError> {
  let clean_edges: Vec<PipelineEdge> = match &options.loop_config {
    Some(cfg) => dag::remove_back_edges(edges, &cfg.back_edge_ids),
    None => edges.to_vec(),
  };

  if dag::has_cycle(nodes, &clean_edges) {
    return Err(match &options.loop_config {
      Some(cfg) => PipelineError::CycleAfterBackEdgeRemoval {
        removed: cfg.back_edge_ids.len(),
      },
      None => PipelineError::CyclicGraph,
    });
  }

  let iterations = options
    .loop_config
    .as_ref()
    .map(|c| c.bounded_iterations())
    .unwrap_or(1);
  // Levels are computed once and reused unchanged across all iterations; only
  // the data threaded through differs.
  let levels = dag::topological_levels(nodes, &clean_edges)?;

  let loop_info = (iterations > 1).then_some(LoopInfo {
    current_iteration: 0,
    total_iterations: iterations,
  });
  let state = Arc::new(Mutex::new(ExecutionState::started(
    levels.len() * iterations as usize,
    loop_info,
  )));

  {
    let mut s = state.lock().await;
    for n in nodes {
      let agent_name = agents
        .get(&n.agent_id)
        .map(|a| a.name.clone())
        .unwrap_or_else(|| "unknown".to_string());
      s.results.insert(
        n.id.clone(),
        NodeResult::pending(n.id.as_str(), n.agent_id.as_str(), agent_name),
      );
    }
    let run_id = s.run_id;
    info!(%run_id, levels = levels.len(), iterations, "pipeline run starting");
  }
  emit(&state, &on_update).await;

  for iter in 0..iterations {
    let iteration = (iterations > 1).then_some(iter);
    if iteration.is_some() {
      let mut s = state.lock().await;
      if let Some(info) = s.loop_info.as_mut() {
        info.current_iteration = iter;
      }
    }

    for level in &levels {
      if aborted(&options) {
        warn!(level = level.level, iteration = iter, "run aborted");
        let mut s = state.lock().await;
        s.status = RunStatus::Failed;
        s.end_time = Some(Utc::now());
        let snapshot = s.clone();
        drop(s);
        on_update(&snapshot);
        return Ok(snapshot);
      }
      execute_level(
        level,
        nodes,
        &clean_edges,
        agents,
        &state,
        initial_input,
        &invoker,
        &on_update,
        iteration,
      )
      .await;
      let mut s = state.lock().await;
      s.current_level = level.level + (iter as usize) * levels.len();
    }
  }

  let mut s = state.lock().await;
  if let Some(last) = levels.last() {
    let last_iteration = (iterations > 1).then_some(iterations - 1);
    let output = final_output(last.node_ids.as_slice(), &s.results, last_iteration);
    s.final_output = Some(output);
  }
  s.status = RunStatus::Completed;
  s.end_time = Some(Utc::now());
  info!(run_id = %s.run_id, "pipeline run completed");
  let snapshot = s.clone();
  drop(s);
  on_update(&snapshot);
  Ok(snapshot)
}

fn aborted(options: &RunOptions) -> bool {
  options
    .abort
    .as_ref()
    .is_some_and(|flag| flag.load(Ordering::Relaxed))
}

async fn emit(state: &Arc<Mutex<ExecutionState>>, on_update: &ExecutionCallback) {
  let snapshot = state.lock().await.clone();
  on_update(&snapshot);
}

/// Dispatches every node of one level concurrently and joins before
/// returning: level N+1 cannot start until every task of level N is retired.
#[instrument(level = "trace", skip_all, fields(level = level.level))]
async fn execute_level(
  level: &crate::types::ExecutionLevel,
  nodes: &[PipelineNode],
  edges: &[PipelineEdge],
  agents: &AgentMap,
  state: &Arc<Mutex<ExecutionState>>,
  initial_input: &str,
  invoker: &Arc<dyn StepInvoker>,
  on_update: &ExecutionCallback,
  iteration: Option<u32>,
) {
  {
    state.lock().await.current_level = level.level;
  }
  let tasks = level.node_ids.iter().map(|node_id| {
    run_node(
      node_id,
      level.level,
      nodes,
      edges,
      agents,
      state,
      initial_input,
      invoker,
      on_update,
      iteration,
    )
  });
  futures::future::join_all(tasks).await;
}

/// Runs one node to a terminal state. Each task owns its own result-key slot
/// exclusively; no two tasks in a level ever write the same key.
#[allow(clippy::too_many_arguments)]
async fn run_node(
  node_id: &str,
  level: usize,
  nodes: &[PipelineNode],
  edges: &[PipelineEdge],
  agents: &AgentMap,
  state: &Arc<Mutex<ExecutionState>>,
  initial_input: &str,
  invoker: &Arc<dyn StepInvoker>,
  on_update: &ExecutionCallback,
  iteration: Option<u32>,
) {
  // Level node ids come from the same node set, so this lookup cannot miss.
  let Some(node) = nodes.iter().find(|n| n.id == node_id) else {
    return;
  };
  let key = result_key(node_id, iteration);

  let Some(agent) = agents.get(&node.agent_id) else {
    // Resolution error: absorbed per node, the run continues. Downstream
    // nodes see this as an upstream failure note.
    warn!(node_id, agent_id = %node.agent_id, "agent not found");
    let mut s = state.lock().await;
    let mut result = NodeResult::pending(node_id, node.agent_id.as_str(), "unknown");
    result.output = "[error: agent not found — this step was skipped]".to_string();
    result.status = NodeStatus::Failed;
    result.error = Some("agent not found".to_string());
    result.iteration = iteration;
    s.results.insert(key, result);
    s.active_nodes.remove(node_id);
    let snapshot = s.clone();
    drop(s);
    on_update(&snapshot);
    return;
  };

  // Build the input under the lock: every predecessor in the clean edge set
  // is already terminal (the level barrier guarantees it).
  let input = {
    let s = state.lock().await;
    let predecessor_keys: Vec<String> = dag::predecessors(node_id, edges)
      .iter()
      .map(|pid| effective_predecessor_key(&s.results, pid, iteration))
      .collect();
    build_node_input(&predecessor_keys, &s.results, initial_input, iteration)
  };

  {
    let mut s = state.lock().await;
    s.active_nodes.insert(node_id.to_string());
    let mut result = NodeResult::pending(node_id, node.agent_id.as_str(), agent.name.as_str());
    result.input = input.clone();
    result.status = NodeStatus::Running;
    result.start_time = Some(Utc::now());
    result.level = Some(level);
    result.iteration = iteration;
    s.results.insert(key.clone(), result);
    let snapshot = s.clone();
    drop(s);
    on_update(&snapshot);
  }

  debug!(node_id, level, iteration = ?iteration, agent = %agent.name, "invoking agent");
  let outcome = invoker.invoke(agent, &input).await;

  let mut s = state.lock().await;
  let end = Utc::now();
  if let Some(result) = s.results.get_mut(&key) {
    result.end_time = Some(end);
    result.duration_ms = result.start_time.map(|st| (end - st).num_milliseconds());
    match outcome {
      Ok(reply) => {
        result.output = reply.output;
        result.token_usage = reply.usage;
        result.status = NodeStatus::Completed;
        debug!(node_id, "agent completed");
      }
      Err(e) => {
        // Fail-soft: the error text becomes the output so downstream context
        // construction has something concrete to quote.
        let message = e.to_string();
        warn!(node_id, error = %message, "agent invocation failed");
        result.output = format!(
          "[error from agent \"{}\"]: {}\n— this note is passed to downstream steps automatically.",
          agent.name, message
        );
        result.error = Some(message);
        result.status = NodeStatus::Failed;
      }
    }
  }
  s.active_nodes.remove(node_id);
  let snapshot = s.clone();
  drop(s);
  on_update(&snapshot);
}

/// Picks the result key a node should read for one predecessor. For
/// iteration > 0 the previous iteration's result is preferred, falling back
/// to the current iteration's (the predecessor already ran earlier in this
/// iteration), falling back to the bare node id.
pub(crate) fn effective_predecessor_key(
  results: &HashMap<String, NodeResult>,
  node_id: &str,
  iteration: Option<u32>,
) -> String {
  if let Some(i) = iteration {
    if i > 0 {
      let previous = result_key(node_id, Some(i - 1));
      if results.contains_key(&previous) {
        return previous;
      }
      let current = result_key(node_id, Some(i));
      if results.contains_key(&current) {
        return current;
      }
    }
  }
  node_id.to_string()
}

/// Builds the textual input for a node from its predecessors' outputs.
///
/// Predecessors with no captured output are skipped rather than emitting an
/// empty block; a node with no predecessor output at all receives the run's
/// original input untouched — the sole entry point for external input.
pub(crate) fn build_node_input(
  predecessor_keys: &[String],
  results: &HashMap<String, NodeResult>,
  initial_input: &str,
  iteration: Option<u32>,
) -> String {
  if predecessor_keys.is_empty() {
    return initial_input.to_string();
  }

  let blocks: Vec<String> = predecessor_keys
    .iter()
    .filter_map(|key| results.get(key))
    .filter(|r| !r.output.is_empty())
    .map(|r| format!("=== output of agent \"{}\" ===\n{}", r.agent_name, r.output))
    .collect();

  if blocks.is_empty() {
    return initial_input.to_string();
  }

  let mut prompt = blocks.join(BLOCK_SEPARATOR);
  if let Some(i) = iteration {
    if i > 0 {
      prompt.push_str(&format!("\n\n(iteration {})", i + 1));
    }
  }
  prompt.push_str(TRAILING_INSTRUCTION);
  prompt
}

/// Synthesizes the run's final output from the last level's results of the
/// last iteration, marking failed contributors.
pub(crate) fn final_output(
  last_level_node_ids: &[String],
  results: &HashMap<String, NodeResult>,
  last_iteration: Option<u32>,
) -> String {
  let parts: Vec<String> = last_level_node_ids
    .iter()
    .filter_map(|node_id| results.get(&result_key(node_id, last_iteration)))
    .filter(|r| !r.output.is_empty())
    .map(|r| {
      if r.status == NodeStatus::Failed {
        format!("[{} — failed]: {}", r.agent_name, r.output)
      } else {
        format!("[{}]: {}", r.agent_name, r.output)
      }
    })
    .collect();
  parts.join(BLOCK_SEPARATOR)
}
