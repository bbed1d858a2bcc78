//! Wire-neutral message and invocation types shared by every backend.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// An extraction request: a message list plus the sampling temperature.
/// `extract` asks for a single complete response guarded into JSON;
/// `stream_text` asks for the same conversation streamed as raw text.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub model: String,
    pub max_tokens: u32,
}

impl Invocation {
    #[must_use]
    pub fn new(messages: Vec<Message>, temperature: f32, model: impl Into<String>) -> Self {
        Self { messages, temperature, model: model.into(), max_tokens: 8_192 }
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    Other,
}

#[derive(Debug, Clone)]
pub struct ExtractResult {
    pub raw_response: String,
    pub parsed: serde_json::Value,
    pub warnings: Vec<modelforge_guards::GuardWarning>,
    pub stop_reason: StopReason,
    pub provider: String,
    pub model_used: String,
    pub tokens_input: Option<u64>,
    pub tokens_output: Option<u64>,
    pub latency_ms: u64,
}
