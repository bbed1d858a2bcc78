//! Document scan: the only phase served synchronously rather than through
//! the job queue, since it is cheap and its result gates nothing but the
//! later phases' prompts.

use crate::phase_trait::{AgentError, Phase, PhaseContext, PhaseOutput};
use modelforge_guards::GuardWarning;
use modelforge_llm::Message;
use modelforge_prompts::{PromptKey, PromptRegistry};
use modelforge_utils::types::{PhaseId, PromptType};
use serde_json::Value;
use std::sync::Arc;

pub struct Phase1Agent {
    pub prompts: Arc<PromptRegistry>,
}

impl Phase1Agent {
    fn prompt_key() -> PromptKey {
        PromptKey { key: "scan_document".into(), phase: PhaseId::Phase1, prompt_type: PromptType::User }
    }
}

impl Phase for Phase1Agent {
    fn id(&self) -> PhaseId {
        PhaseId::Phase1
    }

    fn build_messages(&self, ctx: &PhaseContext) -> Vec<Message> {
        let prompt = self.prompts.resolve(&Self::prompt_key(), None).unwrap_or_default();
        vec![Message::system(prompt), Message::user(ctx.document_text.clone())]
    }

    fn parse_result(&self, parsed: Value, warnings: Vec<GuardWarning>, _ctx: &PhaseContext) -> Result<PhaseOutput, AgentError> {
        Ok(PhaseOutput { value: parsed, base_confidence: 0.9, warnings })
    }
}
