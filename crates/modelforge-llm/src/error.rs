//! Provider adapter error taxonomy.

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("provider {0} is not configured: {1}")]
    Misconfiguration(String, String),

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned an error: {0}")]
    ProviderResponse(String),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("json guard failed: {0}")]
    JsonGuard(String),
}
