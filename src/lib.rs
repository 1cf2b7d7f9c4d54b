//! # agentflow
//!
//! Fault-tolerant DAG execution engine for multi-agent text pipelines.
//!
//! A pipeline is a directed graph of agent steps. The engine detects cycles
//! ([dag::detect_cycles]), partitions the acyclic core into parallelizable
//! levels ([dag::topological_levels]), and runs it level by level
//! ([executor::run_pipeline]) — optionally repeating the whole pass as a
//! bounded loop — while absorbing per-step failures so a run always yields a
//! best-effort final output.
//!
//! The backend call is injected through the [invoker::StepInvoker] trait;
//! [invoker::HttpInvoker] covers the hosted providers, [invoker::EchoInvoker]
//! runs offline.

pub mod dag;
#[cfg(test)]
mod dag_test;
pub mod error;
pub mod executor;
pub mod invoker;
pub mod types;

pub use error::PipelineError;
pub use executor::{ExecutionCallback, RunOptions, run_pipeline};
pub use invoker::{EchoInvoker, HttpInvoker, InvokeError, InvokeReply, StepInvoker};
pub use types::{
  AgentConfig, AgentMap, ConditionKind, CycleInfo, EdgeCondition, ExecutionLevel, ExecutionState,
  LoopConfig, LoopInfo, NodeResult, NodeStatus, PipelineEdge, PipelineNode, RunStatus, TokenUsage,
  result_key,
};
