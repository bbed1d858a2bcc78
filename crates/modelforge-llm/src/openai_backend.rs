//! OpenAI Chat Completions backend.

use crate::backend::{LlmBackend, TextStream};
use crate::error::LlmError;
use crate::types::{ExtractResult, Invocation, Message, Role, StopReason as InvStopReason};
use async_trait::async_trait;
use modelforge_guards::json_guard::{enforce_json, StopReason as GuardStopReason};
use serde_json::json;
use std::time::Instant;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAiBackend {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new_from_env(env_var: Option<&str>) -> Result<Self, LlmError> {
        let var = env_var.unwrap_or("OPENAI_API_KEY");
        let api_key = std::env::var(var)
            .map_err(|_| LlmError::Misconfiguration("openai".into(), format!("{var} not set")))?;
        Ok(Self {
            api_key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            client: reqwest::Client::new(),
        })
    }

    fn convert_messages(messages: &[Message]) -> Vec<serde_json::Value> {
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                };
                json!({"role": role, "content": m.content})
            })
            .collect()
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    fn provider_name(&self) -> &'static str {
        "openai"
    }

    async fn extract(&self, inv: Invocation) -> Result<ExtractResult, LlmError> {
        let body = json!({
            "model": inv.model,
            "temperature": inv.temperature,
            "max_tokens": inv.max_tokens,
            "messages": Self::convert_messages(&inv.messages),
            "response_format": {"type": "json_object"},
        });

        let start = Instant::now();
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
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

        let choice = &payload["choices"][0];
        let raw_response = choice["message"]["content"].as_str().unwrap_or_default().to_string();
        let stop_reason = match choice["finish_reason"].as_str() {
            Some("length") => InvStopReason::MaxTokens,
            Some("stop") => InvStopReason::EndTurn,
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
            tokens_input: payload["usage"]["prompt_tokens"].as_u64(),
            tokens_output: payload["usage"]["completion_tokens"].as_u64(),
            latency_ms,
        })
    }

    async fn stream_text(&self, messages: Vec<Message>, model: &str) -> Result<TextStream, LlmError> {
        use futures::StreamExt;
        let body = json!({
            "model": model,
            "stream": true,
            "messages": Self::convert_messages(&messages),
        });
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::ProviderResponse(format!("{status}: {text}")));
        }

        let stream = resp.bytes_stream().flat_map(|chunk| {
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
        if data == "[DONE]" {
            continue;
        }
        if let Ok(event) = serde_json::from_str::<serde_json::Value>(data) {
            if let Some(t) = event["choices"][0]["delta"]["content"].as_str() {
                out.push(t.to_string());
            }
        }
    }
    out
}
