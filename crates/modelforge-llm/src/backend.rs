//! The provider-neutral contract every backend and decorator implements.

use crate::error::LlmError;
use crate::types::{ExtractResult, Invocation, Message};
use async_trait::async_trait;
use futures::stream::BoxStream;

pub type TextStream = BoxStream<'static, Result<String, LlmError>>;

#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Provider name as surfaced in audit records (`anthropic`, `openai`, `google`).
    fn provider_name(&self) -> &'static str;

    /// A single complete, JSON-guarded response.
    async fn extract(&self, inv: Invocation) -> Result<ExtractResult, LlmError>;

    /// The same conversation, streamed as raw text chunks, for callers
    /// that want incremental progress (e.g. Phase 6 narration).
    async fn stream_text(&self, messages: Vec<Message>, model: &str) -> Result<TextStream, LlmError>;
}
