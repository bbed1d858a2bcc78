//! The contract each LLM phase agent implements: build the message list
//! to send, then turn the guarded JSON response into a typed outcome.

use modelforge_guards::GuardWarning;
use modelforge_llm::Message;
use modelforge_utils::types::PhaseId;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Everything a phase needs to build its prompt and interpret its
/// output: the document text, prior phase results keyed by phase, and
/// any caller-supplied edits for this invocation.
pub struct PhaseContext {
    pub run_id: Uuid,
    pub document_text: String,
    pub prior_results: HashMap<PhaseId, Value>,
    pub edits: Value,
    pub strict_extraction: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("empty critical result: {0}")]
    EmptyCriticalResult(String),
    #[error("missing required dependency: {0:?}")]
    MissingDependency(PhaseId),
}

pub struct PhaseOutput {
    pub value: Value,
    pub base_confidence: f64,
    pub warnings: Vec<GuardWarning>,
}

pub trait Phase: Send + Sync {
    fn id(&self) -> PhaseId;

    fn deps(&self) -> &'static [PhaseId] {
        self.id().deps()
    }

    fn build_messages(&self, ctx: &PhaseContext) -> Vec<Message>;

    fn parse_result(&self, parsed: Value, warnings: Vec<GuardWarning>, ctx: &PhaseContext) -> Result<PhaseOutput, AgentError>;
}
