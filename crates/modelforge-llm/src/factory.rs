//! Builds a concrete, retry-wrapped backend for a provider name.

use crate::anthropic_backend::AnthropicBackend;
use crate::backend::LlmBackend;
use crate::error::LlmError;
use crate::google_backend::GoogleBackend;
use crate::openai_backend::OpenAiBackend;
use crate::retrying_backend::RetryingBackend;
use std::time::Duration;

/// Per-provider default ("standard" tier) model, used when a caller does
/// not pin an explicit model name.
#[must_use]
pub fn standard_model_for(provider: &str) -> Option<&'static str> {
    match provider {
        "anthropic" => Some("claude-sonnet-4-5"),
        "openai" => Some("gpt-4.1"),
        "google" => Some("gemini-2.5-pro"),
        _ => None,
    }
}

pub fn construct_backend_for_provider(
    provider: &str,
    retry_attempts: u32,
    retry_base_delay: Duration,
) -> Result<Box<dyn LlmBackend>, LlmError> {
    match provider {
        "anthropic" => {
            let backend = AnthropicBackend::new_from_env(None)?;
            Ok(Box::new(RetryingBackend::new(backend, retry_attempts, retry_base_delay)))
        }
        "openai" => {
            let backend = OpenAiBackend::new_from_env(None)?;
            Ok(Box::new(RetryingBackend::new(backend, retry_attempts, retry_base_delay)))
        }
        "google" => {
            let backend = GoogleBackend::new_from_env(None)?;
            Ok(Box::new(RetryingBackend::new(backend, retry_attempts, retry_base_delay)))
        }
        other => Err(LlmError::UnknownProvider(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_provider_is_rejected() {
        let result = construct_backend_for_provider("carrier-pigeon", 3, Duration::from_millis(100));
        assert!(matches!(result, Err(LlmError::UnknownProvider(_))));
    }

    #[test]
    fn standard_model_known_for_all_three_providers() {
        assert!(standard_model_for("anthropic").is_some());
        assert!(standard_model_for("openai").is_some());
        assert!(standard_model_for("google").is_some());
        assert!(standard_model_for("llama-farm").is_none());
    }
}
