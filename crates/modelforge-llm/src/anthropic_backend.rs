//! Anthropic Messages API backend.

use crate::backend::{LlmBackend, TextStream};
use crate::error::LlmError;
use crate::types::{ExtractResult, Invocation, Message, Role, StopReason as InvStopReason};
use async_trait::async_trait;
use modelforge_guards::json_guard::{enforce_json, StopReason as GuardStopReason};
use serde_json::json;
use std::time::{Duration, Instant};

const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicBackend {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl AnthropicBackend {
    /// Builds a backend from an explicit API key env var name, defaulting
    /// to `ANTHROPIC_API_KEY`. Missing keys are deferred to first use so
    /// that constructing a backend never itself fails (the factory in
    /// `factory.rs` needs to build every configured backend eagerly even
    /// when only one is actually invoked).
    pub fn new_from_env(env_var: Option<&str>) -> Result<Self, LlmError> {
        let var = env_var.unwrap_or("ANTHROPIC_API_KEY");
        let api_key = std::env::var(var)
            .map_err(|_| LlmError::Misconfiguration("anthropic".into(), format!("{var} not set")))?;
        Ok(Self {
            api_key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            client: reqwest::Client::new(),
        })
    }

    fn convert_messages(messages: &[Message]) -> (Option<String>, Vec<serde_json::Value>) {
        let mut system = None;
        let mut rest = Vec::new();
        for m in messages {
            match m.role {
                Role::System => {
                    system = Some(match system {
                        Some(existing) => format!("{existing}\n{}", m.content),
                        None => m.content.clone(),
                    });
                }
                Role::User => rest.push(json!({"role": "user", "content": m.content})),
                Role::Assistant => rest.push(json!({"role": "assistant", "content": m.content})),
            }
        }
        (system, rest)
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    fn provider_name(&self) -> &'static str {
        "anthropic"
    }

    async fn extract(&self, inv: Invocation) -> Result<ExtractResult, LlmError> {
        let (system, messages) = Self::convert_messages(&inv.messages);
        let mut body = json!({
            "model": inv.model,
            "max_tokens": inv.max_tokens,
            "temperature": inv.temperature,
            "messages": messages,
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }

        let start = Instant::now();
        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::ProviderResponse(format!("{status}: {text}")));
        }

        let payload: serde_json::Value = resp.json().await.map_err(|e| LlmError::Transport(e.to_string()))?;
        let latency_ms = start.elapsed().as_millis() as u64;

        let raw_response = payload["content"]
            .as_array()
            .and_then(|blocks| blocks.first())
            .and_then(|b| b["text"].as_str())
            .unwrap_or_default()
            .to_string();

        let stop_reason = match payload["stop_reason"].as_str() {
            Some("max_tokens") => InvStopReason::MaxTokens,
            Some("end_turn") | Some("stop_sequence") => InvStopReason::EndTurn,
            _ => InvStopReason::Other,
        };
        let guard_stop = match stop_reason {
            InvStopReason::MaxTokens => GuardStopReason::MaxTokens,
            InvStopReason::EndTurn => GuardStopReason::EndTurn,
            InvStopReason::Other => GuardStopReason::Other,
        };

        let guarded = enforce_json(&raw_response, guard_stop).map_err(|e| LlmError::JsonGuard(e.to_string()))?;

        Ok(ExtractResult {
            raw_response,
            parsed: guarded.value,
            warnings: guarded.warnings,
            stop_reason,
            provider: self.provider_name().to_string(),
            model_used: inv.model,
            tokens_input: payload["usage"]["input_tokens"].as_u64(),
            tokens_output: payload["usage"]["output_tokens"].as_u64(),
            latency_ms,
        })
    }

    async fn stream_text(&self, messages: Vec<Message>, model: &str) -> Result<TextStream, LlmError> {
        // One streaming generation per call: request with `stream: true` and
        // decode server-sent `content_block_delta` events into plain text.
        let (system, converted) = Self::convert_messages(&messages);
        let mut body = json!({
            "model": model,
            "max_tokens": 8192,
            "stream": true,
            "messages": converted,
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }

        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::ProviderResponse(format!("{status}: {text}")));
        }

        use futures::StreamExt;
        let byte_stream = resp.bytes_stream();
        let stream = byte_stream.flat_map(|chunk| {
            let texts: Vec<Result<String, LlmError>> = match chunk {
                Ok(bytes) => parse_sse_deltas(&bytes).into_iter().map(Ok).collect(),
                Err(e) => vec![Err(LlmError::Transport(e.to_string()))],
            };
            futures::stream::iter(texts)
        });
        Ok(Box::pin(stream))
    }
}

fn parse_sse_deltas(bytes: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(bytes);
    let mut out = Vec::new();
    for line in text.lines() {
        let Some(data) = line.strip_prefix("data: ") else { continue };
        if let Ok(event) = serde_json::from_str::<serde_json::Value>(data) {
            if event["type"] == "content_block_delta" {
                if let Some(t) = event["delta"]["text"].as_str() {
                    out.push(t.to_string());
                }
            }
        }
    }
    out
}

#[allow(dead_code)]
fn default_timeout() -> Duration {
    Duration::from_secs(120)
}
