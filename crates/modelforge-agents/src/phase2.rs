//! Business model analysis: identifies one or more business-model
//! proposals, each with its own revenue segments. A plan always has at
//! least one proposal and that proposal's segments list is never empty;
//! an empty proposals list, or a first proposal with no segments, after
//! guarding is a failure, not a valid (if thin) result.

use crate::phase_trait::{AgentError, Phase, PhaseContext, PhaseOutput};
use modelforge_guards::{truncate_for_phase2, verify_evidence, GuardWarning};
use modelforge_llm::Message;
use modelforge_prompts::{PromptKey, PromptRegistry};
use modelforge_utils::types::{PhaseId, PromptType};
use serde_json::Value;
use std::sync::Arc;

pub struct Phase2Agent {
    pub prompts: Arc<PromptRegistry>,
}

impl Phase2Agent {
    fn prompt_key() -> PromptKey {
        PromptKey { key: "analyze_business_model".into(), phase: PhaseId::Phase2, prompt_type: PromptType::User }
    }
}

impl Phase for Phase2Agent {
    fn id(&self) -> PhaseId {
        PhaseId::Phase2
    }

    fn build_messages(&self, ctx: &PhaseContext) -> Vec<Message> {
        let prompt = self.prompts.resolve(&Self::prompt_key(), None).unwrap_or_default();
        let truncated = truncate_for_phase2(&ctx.document_text);
        vec![Message::system(prompt), Message::user(truncated)]
    }

    fn parse_result(&self, parsed: Value, mut warnings: Vec<GuardWarning>, ctx: &PhaseContext) -> Result<PhaseOutput, AgentError> {
        let proposals = parsed.get("proposals").and_then(Value::as_array).cloned().unwrap_or_default();
        if proposals.is_empty() {
            return Err(AgentError::EmptyCriticalResult("phase 2 returned no proposals".into()));
        }
        let primary_segments_empty = proposals[0].get("segments").and_then(Value::as_array).map(Vec::is_empty).unwrap_or(true);
        if primary_segments_empty {
            return Err(AgentError::EmptyCriticalResult("phase 2's primary proposal returned no segments".into()));
        }

        for proposal in &proposals {
            let Some(segments) = proposal.get("segments").and_then(Value::as_array) else { continue };
            for segment in segments {
                let evidence = segment.get("evidence").and_then(Value::as_str);
                if let Some(warning) = verify_evidence(evidence, &ctx.document_text) {
                    warnings.push(warning);
                }
            }
        }

        Ok(PhaseOutput { value: parsed, base_confidence: 0.85, warnings })
    }
}
