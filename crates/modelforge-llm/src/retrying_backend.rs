//! Wraps any backend with exponential backoff retry. JSON guard failures
//! are never retried — a structurally broken response will not improve on
//! a second attempt with the same prompt.

use crate::backend::{LlmBackend, TextStream};
use crate::error::LlmError;
use crate::types::{ExtractResult, Invocation, Message};
use async_trait::async_trait;
use std::time::Duration;

pub struct RetryingBackend<B> {
    inner: B,
    max_attempts: u32,
    base_delay: Duration,
}

impl<B: LlmBackend> RetryingBackend<B> {
    #[must_use]
    pub fn new(inner: B, max_attempts: u32, base_delay: Duration) -> Self {
        Self { inner, max_attempts: max_attempts.max(1), base_delay }
    }
}

#[async_trait]
impl<B: LlmBackend> LlmBackend for RetryingBackend<B> {
    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }

    async fn extract(&self, inv: Invocation) -> Result<ExtractResult, LlmError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.inner.extract(inv.clone()).await {
                Ok(result) => return Ok(result),
                Err(LlmError::JsonGuard(msg)) => return Err(LlmError::JsonGuard(msg)),
                Err(e) if attempt >= self.max_attempts => return Err(e),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "retrying llm call after transient failure");
                    let delay = self.base_delay * 2u32.pow(attempt - 1);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn stream_text(&self, messages: Vec<Message>, model: &str) -> Result<TextStream, LlmError> {
        self.inner.stream_text(messages, model).await
    }
}
