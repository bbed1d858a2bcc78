//! Model design: assigns spreadsheet cell categories to catalog items,
//! deciding which become standalone add-on lines versus rolling into a
//! baseline P&L category. Labels that look like bare numbers are
//! replaced with the Phase 1 catalog's real label for that cell, and an
//! empty category is filled in from the catalog's block, rather than
//! trusting the model's raw output.

use crate::phase_trait::{AgentError, Phase, PhaseContext, PhaseOutput};
use modelforge_guards::{apply_penalties, is_numeric_label, scrub_numeric_labels, verify_evidence, GuardWarning};
use modelforge_llm::Message;
use modelforge_prompts::{PromptKey, PromptRegistry};
use modelforge_utils::types::{PhaseId, PromptType};
use serde_json::{json, Value};
use std::sync::Arc;

pub struct Phase4Agent {
    pub prompts: Arc<PromptRegistry>,
    /// True when the caller asked for a quick estimation pass rather than
    /// full parameter design (spec's Phase 4 "estimation mode").
    pub estimation_mode: bool,
}

impl Phase4Agent {
    fn prompt_key() -> PromptKey {
        PromptKey { key: "design_model".into(), phase: PhaseId::Phase4, prompt_type: PromptType::User }
    }
}

/// A catalog entry for the given `(sheet, cell)`, if Phase 1 produced one.
fn catalog_entry<'a>(catalog: &'a [Value], sheet: &str, cell: &str) -> Option<&'a Value> {
    catalog.iter().find(|entry| entry.get("sheet").and_then(Value::as_str) == Some(sheet) && entry.get("cell").and_then(Value::as_str) == Some(cell))
}

impl Phase for Phase4Agent {
    fn id(&self) -> PhaseId {
        PhaseId::Phase4
    }

    fn build_messages(&self, ctx: &PhaseContext) -> Vec<Message> {
        let mut prompt = self.prompts.resolve(&Self::prompt_key(), None).unwrap_or_default();
        if self.estimation_mode {
            prompt.push_str("\n\nThis is a quick estimation pass: favour speed over exhaustive coverage.");
        }
        let mapping = ctx.prior_results.get(&PhaseId::Phase3).cloned().unwrap_or_else(|| json!({}));
        let catalog = ctx.prior_results.get(&PhaseId::Phase1).and_then(|v| v.get("catalog")).cloned().unwrap_or(Value::Null);
        let payload = json!({
            "sheet_mappings": mapping.get("sheet_mappings").cloned().unwrap_or(Value::Null),
            "catalog": catalog,
            "edits": ctx.edits,
        });
        vec![Message::system(prompt), Message::user(payload.to_string())]
    }

    fn parse_result(&self, mut parsed: Value, mut warnings: Vec<GuardWarning>, ctx: &PhaseContext) -> Result<PhaseOutput, AgentError> {
        let catalog = ctx.prior_results.get(&PhaseId::Phase1).and_then(|v| v.get("catalog")).and_then(Value::as_array).cloned().unwrap_or_default();
        let base_confidence = if self.estimation_mode { 0.6 } else { 0.85 };

        if let Some(assignments) = parsed.get_mut("cell_assignments").and_then(Value::as_array_mut) {
            for cell in assignments.iter_mut() {
                let mut item_warnings = Vec::new();
                let sheet = cell.get("sheet").and_then(Value::as_str).map(str::to_string);
                let cell_id = cell.get("cell").and_then(Value::as_str).map(str::to_string);
                let matched_catalog = sheet.as_deref().zip(cell_id.as_deref()).and_then(|(s, c)| catalog_entry(&catalog, s, c));

                if let Some(label) = cell.get("label").and_then(Value::as_str).map(str::to_string) {
                    if is_numeric_label(&label) {
                        item_warnings.push(GuardWarning::NumericLabel);
                        let replacement = matched_catalog
                            .and_then(|entry| entry.get("label"))
                            .and_then(Value::as_str)
                            .map(str::to_string)
                            .unwrap_or_else(|| scrub_numeric_labels(&label).0);
                        cell["label"] = json!(replacement);
                    }
                }

                let category_empty = cell.get("category").and_then(Value::as_str).map(str::is_empty).unwrap_or(true);
                if category_empty {
                    if let Some(block) = matched_catalog.and_then(|entry| entry.get("block")).and_then(Value::as_str) {
                        cell["category"] = json!(block);
                    }
                }

                let evidence = cell.get("evidence").and_then(Value::as_str);
                if evidence.is_some() {
                    if let Some(w) = verify_evidence(evidence, &ctx.document_text) {
                        item_warnings.push(w);
                    }
                }

                cell["confidence"] = json!(apply_penalties(base_confidence, &item_warnings));
                warnings.extend(item_warnings);
            }
        }

        Ok(PhaseOutput { value: parsed, base_confidence, warnings })
    }
}
