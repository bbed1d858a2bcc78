//! Google Gemini `generateContent` / `streamGenerateContent` backend.

use crate::backend::{LlmBackend, TextStream};
use crate::error::LlmError;
use crate::types::{ExtractResult, Invocation, Message, Role, StopReason as InvStopReason};
use async_trait::async_trait;
use modelforge_guards::json_guard::{enforce_json, StopReason as GuardStopReason};
use serde_json::json;
use std::time::Instant;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GoogleBackend {
    api_key: String,
    client: reqwest::Client,
}

impl GoogleBackend {
    pub fn new_from_env(env_var: Option<&str>) -> Result<Self, LlmError> {
        let var = env_var.unwrap_or("GOOGLE_API_KEY");
        let api_key = std::env::var(var)
            .map_err(|_| LlmError::Misconfiguration("google".into(), format!("{var} not set")))?;
        Ok(Self { api_key, client: reqwest::Client::new() })
    }

    fn convert_contents(messages: &[Message]) -> (Option<String>, Vec<serde_json::Value>) {
        let mut system = None;
        let mut contents = Vec::new();
        for m in messages {
            match m.role {
                Role::System => {
                    system = Some(match system {
                        Some(existing) => format!("{existing}\n{}", m.content),
                        None => m.content.clone(),
                    });
                }
                Role::User => contents.push(json!({"role": "user", "parts": [{"text": m.content}]})),
                Role::Assistant => contents.push(json!({"role": "model", "parts": [{"text": m.content}]})),
            }
        }
        (system, contents)
    }
}

#[async_trait]
impl LlmBackend for GoogleBackend {
    fn provider_name(&self) -> &'static str {
        "google"
    }

    async fn extract(&self, inv: Invocation) -> Result<ExtractResult, LlmError> {
        let (system, contents) = Self::convert_contents(&inv.messages);
        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": inv.temperature,
                "maxOutputTokens": inv.max_tokens,
                "responseMimeType": "application/json",
            },
        });
        if let Some(system) = system {
            body["systemInstruction"] = json!({"parts": [{"text": system}]});
        }

        let url = format!("{BASE_URL}/{}:generateContent?key={}", inv.model, self.api_key);
        let start = Instant::now();
        let resp = self
            .client
            .post(&url)
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

        let candidate = &payload["candidates"][0];
        let raw_response = candidate["content"]["parts"][0]["text"].as_str().unwrap_or_default().to_string();
        let stop_reason = match candidate["finishReason"].as_str() {
            Some("MAX_TOKENS") => InvStopReason::MaxTokens,
            Some("STOP") => InvStopReason::EndTurn,
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
            tokens_input: payload["usageMetadata"]["promptTokenCount"].as_u64(),
            tokens_output: payload["usageMetadata"]["candidatesTokenCount"].as_u64(),
            latency_ms,
        })
    }

    async fn stream_text(&self, messages: Vec<Message>, model: &str) -> Result<TextStream, LlmError> {
        use futures::StreamExt;
        let (system, contents) = Self::convert_contents(&messages);
        let mut body = json!({"contents": contents});
        if let Some(system) = system {
            body["systemInstruction"] = json!({"parts": [{"text": system}]});
        }
        let url = format!("{BASE_URL}/{model}:streamGenerateContent?alt=sse&key={}", self.api_key);
        let resp = self
            .client
            .post(&url)
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
        if let Ok(event) = serde_json::from_str::<serde_json::Value>(data) {
            if let Some(t) = event["candidates"][0]["content"]["parts"][0]["text"].as_str() {
                out.push(t.to_string());
            }
        }
    }
    out
}
