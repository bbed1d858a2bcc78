//! Built-in prompt text, embedded at compile time the way the teacher
//! embeds its own template strings.

use crate::PromptKey;
use modelforge_utils::types::{PhaseId, PromptType};
use std::collections::HashMap;

macro_rules! builtin {
    ($key:expr, $phase:expr, $prompt_type:expr, $path:expr) => {
        (
            PromptKey { key: $key.to_string(), phase: $phase, prompt_type: $prompt_type },
            include_str!($path).to_string(),
        )
    };
}

#[must_use]
pub fn builtin_prompts() -> HashMap<PromptKey, String> {
    HashMap::from([
        builtin!("scan_document", PhaseId::Phase1, PromptType::User, "prompts/phase1_scan.txt"),
        builtin!("analyze_business_model", PhaseId::Phase2, PromptType::User, "prompts/phase2_analyze.txt"),
        builtin!("map_template", PhaseId::Phase3, PromptType::User, "prompts/phase3_map.txt"),
        builtin!("design_model", PhaseId::Phase4, PromptType::User, "prompts/phase4_design.txt"),
        builtin!("extract_parameters", PhaseId::Phase5, PromptType::User, "prompts/phase5_extract.txt"),
    ])
}
