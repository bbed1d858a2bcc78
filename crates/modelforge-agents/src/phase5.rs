//! Parameter extraction: pulls the concrete numbers the recalc engine
//! needs (first-year revenue, growth rate, COGS rate, opex and its
//! growth) out of the document. Never returns zero extractions: an empty
//! guarded result is backfilled with low-confidence defaults rather than
//! failing the phase, since every cell Phase 4 designed needs a value to
//! seed the spreadsheet. A numeric `label` is replaced with the matching
//! Phase 4 cell assignment's (already catalog-corrected) label; the
//! separate `concept` field has no Phase 4 counterpart and keeps the
//! generic sentinel treatment.

use crate::phase_trait::{AgentError, Phase, PhaseContext, PhaseOutput};
use modelforge_guards::{apply_penalties, ensure_completeness, is_numeric_label, scrub_numeric_labels, truncate_for_phase5, verify_evidence, GuardWarning};
use modelforge_llm::Message;
use modelforge_prompts::{PromptKey, PromptRegistry};
use modelforge_utils::types::{PhaseId, PromptType};
use serde_json::{json, Value};
use std::sync::Arc;

/// Strict mode requires every extraction to carry document evidence;
/// normal mode tolerates inferred values with a confidence penalty only.
/// Neither floor applies to a completeness-synthesized `"default"`
/// extraction: its low confidence is the point, not a bug to clamp away.
const STRICT_MIN_CONFIDENCE: f64 = 0.5;
const NORMAL_MIN_CONFIDENCE: f64 = 0.2;

pub struct Phase5Agent {
    pub prompts: Arc<PromptRegistry>,
}

impl Phase5Agent {
    fn prompt_key() -> PromptKey {
        PromptKey { key: "extract_parameters".into(), phase: PhaseId::Phase5, prompt_type: PromptType::User }
    }
}

impl Phase for Phase5Agent {
    fn id(&self) -> PhaseId {
        PhaseId::Phase5
    }

    fn build_messages(&self, ctx: &PhaseContext) -> Vec<Message> {
        let prompt = self.prompts.resolve(&Self::prompt_key(), None).unwrap_or_default();
        let truncated = truncate_for_phase5(&ctx.document_text);
        let cells = ctx.prior_results.get(&PhaseId::Phase4).cloned().unwrap_or_else(|| json!({}));
        let payload = json!({ "document_excerpt": truncated, "cell_assignments": cells.get("cell_assignments").cloned().unwrap_or(Value::Null) });
        vec![Message::system(prompt), Message::user(payload.to_string())]
    }

    fn parse_result(&self, parsed: Value, mut warnings: Vec<GuardWarning>, ctx: &PhaseContext) -> Result<PhaseOutput, AgentError> {
        let phase4_cells: Vec<Value> =
            ctx.prior_results.get(&PhaseId::Phase4).and_then(|v| v.get("cell_assignments")).and_then(Value::as_array).cloned().unwrap_or_default();
        let catalog_labels: Vec<String> =
            phase4_cells.iter().filter_map(|c| c.get("label").and_then(Value::as_str).map(str::to_string)).collect();

        let extractions = parsed.get("extractions").and_then(Value::as_array).cloned().unwrap_or_default();
        let (mut extractions, completeness_warnings) = ensure_completeness(extractions, &catalog_labels);
        warnings.extend(completeness_warnings);

        let min_confidence = if ctx.strict_extraction { STRICT_MIN_CONFIDENCE } else { NORMAL_MIN_CONFIDENCE };

        for extraction in extractions.iter_mut() {
            let mut item_warnings = Vec::new();
            let sheet = extraction.get("sheet").and_then(Value::as_str).map(str::to_string);
            let cell_id = extraction.get("cell").and_then(Value::as_str).map(str::to_string);
            let matched_phase4_cell = sheet.as_deref().zip(cell_id.as_deref()).and_then(|(s, c)| {
                phase4_cells
                    .iter()
                    .find(|cell| cell.get("sheet").and_then(Value::as_str) == Some(s) && cell.get("cell").and_then(Value::as_str) == Some(c))
            });

            if let Some(label) = extraction.get("label").and_then(Value::as_str).map(str::to_string) {
                if is_numeric_label(&label) {
                    item_warnings.push(GuardWarning::NumericLabel);
                    let replacement = matched_phase4_cell
                        .and_then(|cell| cell.get("label"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| scrub_numeric_labels(&label).0);
                    extraction["label"] = json!(replacement);
                }
            }

            if let Some(concept) = extraction.get("concept").and_then(Value::as_str).map(str::to_string) {
                let (scrubbed, warning) = scrub_numeric_labels(&concept);
                if let Some(w) = warning {
                    item_warnings.push(w);
                }
                extraction["concept"] = json!(scrubbed);
            }

            let source = extraction.get("source").and_then(Value::as_str).unwrap_or("inferred");
            let evidence = extraction.get("evidence").and_then(Value::as_str);
            if source == "document" {
                if let Some(w) = verify_evidence(evidence, &ctx.document_text) {
                    item_warnings.push(w);
                }
            }

            let starting_confidence = extraction.get("confidence").and_then(Value::as_f64).unwrap_or(0.5);
            let confidence = apply_penalties(starting_confidence, &item_warnings);
            let confidence = if source == "default" { confidence } else { confidence.max(min_confidence) };
            extraction["confidence"] = json!(confidence);

            warnings.extend(item_warnings);
        }

        Ok(PhaseOutput { value: json!({ "extractions": extractions }), base_confidence: 0.75, warnings })
    }
}
