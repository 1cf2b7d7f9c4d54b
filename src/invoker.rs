//! Step invocation: the boundary between the engine and text-generation
//! backends.
//!
//! The engine treats a [StepInvoker] as a black box with a retry-free,
//! fail-soft contract: a single failed attempt is final for that node in that
//! iteration, and the failure is absorbed by the engine rather than aborting
//! the run. [HttpInvoker] talks to the four hosted providers the editor
//! supports; [EchoInvoker] is a deterministic offline stand-in for dry runs
//! and tests.

use async_trait::async_trait;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::types::{AgentConfig, TokenUsage};

/// Backend reply for one invocation.
#[derive(Debug, Clone)]
pub struct InvokeReply {
  pub output: String,
  /// `None` when the backend did not report usage.
  pub usage: Option<TokenUsage>,
}

/// Failure of one backend invocation. Always absorbed per node by the engine.
#[derive(Debug, Error)]
pub enum InvokeError {
  #[error("no API key configured for agent \"{agent}\" (provider {provider})")]
  MissingApiKey { agent: String, provider: String },

  #[error("unsupported provider: {0}")]
  UnsupportedProvider(String),

  #[error("request to {provider} failed: {source}")]
  Http {
    provider: String,
    #[source]
    source: reqwest::Error,
  },

  #[error("{provider} API error ({status}): {body}")]
  Api {
    provider: String,
    status: u16,
    body: String,
  },

  #[error("{provider} returned a malformed response: {detail}")]
  MalformedResponse { provider: String, detail: String },
}

/// Asynchronous step invoker: turns a resolved agent plus a textual input
/// into textual output and usage metrics, or a failure. No retries.
#[async_trait]
pub trait StepInvoker: Send + Sync {
  async fn invoke(&self, agent: &AgentConfig, input: &str) -> Result<InvokeReply, InvokeError>;
}

/// Offline invoker: echoes the agent name and an input excerpt. Used by the
/// CLI `--dry-run` path and by tests that need a real data flow without a
/// backend.
#[derive(Debug, Default)]
pub struct EchoInvoker;

#[async_trait]
impl StepInvoker for EchoInvoker {
  async fn invoke(&self, agent: &AgentConfig, input: &str) -> Result<InvokeReply, InvokeError> {
    let excerpt: String = input.chars().take(160).collect();
    Ok(InvokeReply {
      output: format!("[{}] {}", agent.name, excerpt),
      usage: None,
    })
  }
}

/// HTTP invoker for the hosted chat-completion providers the editor supports:
/// `openai`, `anthropic`, `googleai` (Gemini), `mistral`.
#[derive(Debug, Clone, Default)]
pub struct HttpInvoker {
  client: reqwest::Client,
}

impl HttpInvoker {
  pub fn new() -> Self {
    Self {
      client: reqwest::Client::new(),
    }
  }
}

#[async_trait]
impl StepInvoker for HttpInvoker {
  #[instrument(level = "trace", skip_all, fields(agent = %agent.name, provider = %agent.provider))]
  async fn invoke(&self, agent: &AgentConfig, input: &str) -> Result<InvokeReply, InvokeError> {
    let api_key = agent
      .api_key
      .as_deref()
      .filter(|k| !k.is_empty())
      .ok_or_else(|| InvokeError::MissingApiKey {
        agent: agent.name.clone(),
        provider: agent.provider.clone(),
      })?;

    let provider = agent.provider.as_str();
    let request = match provider {
      "openai" => self
        .client
        .post("https://api.openai.com/v1/chat/completions")
        .bearer_auth(api_key)
        .json(&openai_body(agent, input)),
      "mistral" => self
        .client
        .post("https://api.mistral.ai/v1/chat/completions")
        .bearer_auth(api_key)
        .json(&openai_body(agent, input)),
      "anthropic" => self
        .client
        .post("https://api.anthropic.com/v1/messages")
        .header("x-api-key", api_key)
        .header("anthropic-version", "2023-06-01")
        .json(&anthropic_body(agent, input)),
      "googleai" => self
        .client
        .post(format!(
          "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
          agent.model_id, api_key
        ))
        .json(&gemini_body(agent, input)),
      other => return Err(InvokeError::UnsupportedProvider(other.to_string())),
    };

    debug!("sending chat request");
    let response = request.send().await.map_err(|source| InvokeError::Http {
      provider: provider.to_string(),
      source,
    })?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(InvokeError::Api {
        provider: provider.to_string(),
        status: status.as_u16(),
        body,
      });
    }

    let value: Value = response.json().await.map_err(|source| InvokeError::Http {
      provider: provider.to_string(),
      source,
    })?;

    match provider {
      "openai" | "mistral" => parse_openai_reply(provider, &value),
      "anthropic" => parse_anthropic_reply(&value),
      "googleai" => parse_gemini_reply(&value),
      _ => unreachable!("provider validated above"),
    }
  }
}

/// Request body for the OpenAI-compatible chat endpoint (also Mistral).
pub(crate) fn openai_body(agent: &AgentConfig, input: &str) -> Value {
  let mut messages = Vec::new();
  if !agent.system_prompt.is_empty() {
    messages.push(json!({ "role": "system", "content": agent.system_prompt }));
  }
  messages.push(json!({ "role": "user", "content": input }));
  json!({ "model": agent.model_id, "messages": messages })
}

/// Request body for the Anthropic messages endpoint.
pub(crate) fn anthropic_body(agent: &AgentConfig, input: &str) -> Value {
  let mut body = json!({
    "model": agent.model_id,
    "max_tokens": 4096,
    "messages": [{ "role": "user", "content": input }],
  });
  if !agent.system_prompt.is_empty() {
    body["system"] = json!(agent.system_prompt);
  }
  body
}

/// Request body for the Gemini generateContent endpoint.
pub(crate) fn gemini_body(agent: &AgentConfig, input: &str) -> Value {
  let mut body = json!({
    "contents": [{ "role": "user", "parts": [{ "text": input }] }],
  });
  if !agent.system_prompt.is_empty() {
    body["systemInstruction"] = json!({ "parts": [{ "text": agent.system_prompt }] });
  }
  body
}

fn u32_at(value: &Value, pointer: &str) -> u32 {
  value
    .pointer(pointer)
    .and_then(Value::as_u64)
    .unwrap_or(0) as u32
}

/// Parses an OpenAI-compatible chat response (OpenAI, Mistral).
pub(crate) fn parse_openai_reply(provider: &str, value: &Value) -> Result<InvokeReply, InvokeError> {
  let output = value
    .pointer("/choices/0/message/content")
    .and_then(Value::as_str)
    .ok_or_else(|| InvokeError::MalformedResponse {
      provider: provider.to_string(),
      detail: "missing choices[0].message.content".to_string(),
    })?
    .to_string();
  let usage = value.get("usage").map(|u| TokenUsage {
    prompt: u32_at(u, "/prompt_tokens"),
    completion: u32_at(u, "/completion_tokens"),
    total: u32_at(u, "/total_tokens"),
  });
  Ok(InvokeReply { output, usage })
}

/// Parses an Anthropic messages response; text blocks are concatenated.
pub(crate) fn parse_anthropic_reply(value: &Value) -> Result<InvokeReply, InvokeError> {
  let blocks = value
    .get("content")
    .and_then(Value::as_array)
    .ok_or_else(|| InvokeError::MalformedResponse {
      provider: "anthropic".to_string(),
      detail: "missing content array".to_string(),
    })?;
  let output: String = blocks
    .iter()
    .filter_map(|b| b.get("text").and_then(Value::as_str))
    .collect();
  let usage = value.get("usage").map(|u| {
    let prompt = u32_at(u, "/input_tokens");
    let completion = u32_at(u, "/output_tokens");
    TokenUsage {
      prompt,
      completion,
      total: prompt + completion,
    }
  });
  Ok(InvokeReply { output, usage })
}

/// Parses a Gemini generateContent response.
pub(crate) fn parse_gemini_reply(value: &Value) -> Result<InvokeReply, InvokeError> {
  let output = value
    .pointer("/candidates/0/content/parts/0/text")
    .and_then(Value::as_str)
    .ok_or_else(|| InvokeError::MalformedResponse {
      provider: "googleai".to_string(),
      detail: "missing candidates[0].content.parts[0].text".to_string(),
    })?
    .to_string();
  let usage = value.get("usageMetadata").map(|u| TokenUsage {
    prompt: u32_at(u, "/promptTokenCount"),
    completion: u32_at(u, "/candidatesTokenCount"),
    total: u32_at(u, "/totalTokenCount"),
  });
  Ok(InvokeReply { output, usage })
}
