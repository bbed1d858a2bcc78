//! Template mapping: proposes which template sheets a plan needs and how
//! its segments map onto them. A missing or empty `selected_proposal` in
//! edits is fine: the agent proposes one rather than requiring the caller
//! to have picked first.

use crate::phase_trait::{AgentError, Phase, PhaseContext, PhaseOutput};
use modelforge_guards::GuardWarning;
use modelforge_llm::Message;
use modelforge_prompts::{PromptKey, PromptRegistry};
use modelforge_utils::types::{PhaseId, PromptType};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct Phase3Agent {
    pub prompts: Arc<PromptRegistry>,
}

impl Phase3Agent {
    fn prompt_key() -> PromptKey {
        PromptKey { key: "map_template".into(), phase: PhaseId::Phase3, prompt_type: PromptType::User }
    }
}

impl Phase for Phase3Agent {
    fn id(&self) -> PhaseId {
        PhaseId::Phase3
    }

    fn build_messages(&self, ctx: &PhaseContext) -> Vec<Message> {
        let prompt = self.prompts.resolve(&Self::prompt_key(), None).unwrap_or_default();
        let proposals = ctx
            .prior_results
            .get(&PhaseId::Phase2)
            .and_then(|v| v.get("proposals"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let selected = ctx.edits.get("selected_proposal").cloned();
        let chosen_proposal = selected.as_ref().and_then(Value::as_u64).and_then(|i| proposals.get(i as usize)).or_else(|| proposals.first());
        let user_payload = json!({
            "proposal": chosen_proposal,
            "selected_proposal": selected,
        });
        vec![Message::system(prompt), Message::user(user_payload.to_string())]
    }

    fn parse_result(&self, parsed: Value, warnings: Vec<GuardWarning>, _ctx: &PhaseContext) -> Result<PhaseOutput, AgentError> {
        // sheet_mappings may legitimately be empty when the plan is a
        // single-product business; no critical-result check here.
        Ok(PhaseOutput { value: parsed, base_confidence: 0.8, warnings })
    }
}
