//! Provider adapter: one contract (`LlmBackend`) over Anthropic, OpenAI,
//! and Google, with retry and JSON-guarding handled uniformly.

pub mod anthropic_backend;
pub mod backend;
pub mod error;
pub mod factory;
pub mod google_backend;
pub mod openai_backend;
pub mod retrying_backend;
pub mod types;

pub use backend::{LlmBackend, TextStream};
pub use error::LlmError;
pub use factory::{construct_backend_for_provider, standard_model_for};
pub use types::{ExtractResult, Invocation, Message, Role, StopReason};
