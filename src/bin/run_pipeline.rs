//! CLI: Run an agent pipeline from a saved pipeline JSON document.
//!
//! Usage: `run_pipeline [OPTIONS] --agents <agents.json> <path-to-pipeline-json>`
//! Example: `run_pipeline --agents agents.json --input "draft a summary" pipeline.json`
//!
//! The pipeline document holds the logical graph (`nodes`, `edges`, optional
//! `loop`); the agents file is a list of agent configurations keyed by id.
//! With `--dry-run` no backend is contacted; each step echoes its input.
//!
//! Set RUST_LOG=agentflow=trace for TRACE-level span enter/exit and events.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use agentflow::{
  AgentConfig, EchoInvoker, ExecutionCallback, ExecutionState, HttpInvoker, LoopConfig,
  PipelineEdge, PipelineNode, RunOptions, RunStatus, StepInvoker, run_pipeline,
};
use clap::Parser;
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

/// Saved pipeline document, as exported by the editor.
#[derive(Debug, Deserialize)]
struct PipelineDoc {
  nodes: Vec<PipelineNode>,
  edges: Vec<PipelineEdge>,
  #[serde(rename = "loop", default)]
  loop_config: Option<LoopConfig>,
}

/// Run an agent pipeline from a saved pipeline JSON document.
#[derive(Parser, Debug)]
#[command(name = "run_pipeline")]
#[command(after_help = r#"Examples:
  run_pipeline --agents agents.json --input "draft a summary" pipeline.json
  run_pipeline --agents agents.json --dry-run --json pipeline.json"#)]
struct Args {
  /// Path to the agents file: a JSON array of agent configurations.
  #[arg(long, value_name = "FILE")]
  agents: PathBuf,

  /// Initial input fed to every root node of the graph.
  #[arg(long, value_name = "TEXT", default_value = "")]
  input: String,

  /// Echo inputs instead of calling any backend.
  #[arg(long)]
  dry_run: bool,

  /// Print the final execution state as JSON instead of a summary.
  #[arg(long)]
  json: bool,

  /// Path to the pipeline JSON document.
  #[arg(value_name = "path-to-pipeline-json")]
  pipeline_path: PathBuf,
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
    .with_writer(std::io::stderr)
    .init();

  info!("run_pipeline starting");
  let args = Args::parse();

  let doc_text = match fs::read_to_string(&args.pipeline_path) {
    Ok(s) => s,
    Err(e) => {
      eprintln!("Error reading {}: {}", args.pipeline_path.display(), e);
      process::exit(1);
    }
  };
  let doc: PipelineDoc = match serde_json::from_str(&doc_text) {
    Ok(d) => d,
    Err(e) => {
      eprintln!("Error parsing pipeline document: {}", e);
      process::exit(1);
    }
  };

  let agents_text = match fs::read_to_string(&args.agents) {
    Ok(s) => s,
    Err(e) => {
      eprintln!("Error reading {}: {}", args.agents.display(), e);
      process::exit(1);
    }
  };
  let agent_list: Vec<AgentConfig> = match serde_json::from_str(&agents_text) {
    Ok(a) => a,
    Err(e) => {
      eprintln!("Error parsing agents file: {}", e);
      process::exit(1);
    }
  };
  let agents: HashMap<String, AgentConfig> =
    agent_list.into_iter().map(|a| (a.id.clone(), a)).collect();

  info!(
    nodes = doc.nodes.len(),
    edges = doc.edges.len(),
    agents = agents.len(),
    dry_run = args.dry_run,
    "pipeline loaded"
  );

  let invoker: Arc<dyn StepInvoker> = if args.dry_run {
    Arc::new(EchoInvoker)
  } else {
    Arc::new(HttpInvoker::new())
  };

  let on_update: ExecutionCallback = Arc::new(|state: &ExecutionState| {
    tracing::debug!(
      status = %state.status,
      current_level = state.current_level,
      active = state.active_nodes.len(),
      "state update"
    );
  });

  let state = match run_pipeline(
    &doc.nodes,
    &doc.edges,
    &agents,
    &args.input,
    invoker,
    on_update,
    RunOptions {
      loop_config: doc.loop_config,
      abort: None,
    },
  )
  .await
  {
    Ok(s) => s,
    Err(e) => {
      eprintln!("Pipeline error: {}", e);
      process::exit(1);
    }
  };

  if args.json {
    match serde_json::to_string_pretty(&state) {
      Ok(s) => println!("{}", s),
      Err(e) => {
        eprintln!("Error serializing state: {}", e);
        process::exit(1);
      }
    }
  } else {
    let completed = state
      .results
      .values()
      .filter(|r| r.status == agentflow::NodeStatus::Completed)
      .count();
    let failed = state
      .results
      .values()
      .filter(|r| r.status == agentflow::NodeStatus::Failed)
      .count();
    println!("Pipeline completed.");
    println!("  Status: {}", state.status);
    println!("  Steps: {} completed, {} failed", completed, failed);
    if let Some(ref output) = state.final_output {
      println!("  Final output:\n{}", output);
    }
  }

  if state.status != RunStatus::Completed {
    process::exit(1);
  }
}
