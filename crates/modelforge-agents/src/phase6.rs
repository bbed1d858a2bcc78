//! Phase 6 is not an LLM call: it resolves what the (out of scope)
//! template writer needs from Phase 3 and Phase 4 before it can place
//! values into spreadsheet cells. `modelforge-engine`'s emitter module
//! combines this with the recalc engine's segment split to produce the
//! final slot -> value map.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct EmitPlan {
    pub segment_count: usize,
    pub adopted_add_ons: Vec<String>,
}

const BASELINE_CATEGORIES: &[&str] = &["revenue", "cogs", "opex", "gross_profit", "operating_profit", "fcf"];

/// The first non-empty array found across `keys`, checked in order.
fn first_nonempty_array<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter().find_map(|key| value.get(key).and_then(Value::as_array).filter(|a| !a.is_empty()))
}

/// Any `cell_assignments` entry whose category is not one of the
/// baseline P&L lines is an adopted add-on: a standalone cell the
/// business plan warranted beyond the standard model shape.
#[must_use]
pub fn resolve_emit_plan(phase3_result: &Value, phase4_result: &Value) -> EmitPlan {
    let segment_count = first_nonempty_array(phase3_result, &["sheet_mappings", "segment_mapping", "sheets"])
        .map(|entries| {
            let distinct_segments: std::collections::HashSet<&str> =
                entries.iter().filter_map(|e| e.get("segment").and_then(Value::as_str)).collect();
            if distinct_segments.is_empty() { entries.len() } else { distinct_segments.len() }
        })
        .unwrap_or(1)
        .max(1);

    let adopted_add_ons = phase4_result
        .get("cell_assignments")
        .and_then(Value::as_array)
        .map(|cells| {
            cells
                .iter()
                .filter_map(|c| {
                    let category = c.get("category").and_then(Value::as_str)?;
                    let label = c.get("label").and_then(Value::as_str)?;
                    if BASELINE_CATEGORIES.contains(&category) {
                        None
                    } else {
                        Some(label.to_string())
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    EmitPlan { segment_count, adopted_add_ons }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_baseline_categories_are_adopted_add_ons() {
        let phase3 = json!({"segment_mapping": [{"segment": "a", "sheet": "s1"}, {"segment": "b", "sheet": "s1"}]});
        let phase4 = json!({"cell_assignments": [
            {"label": "Revenue", "category": "revenue"},
            {"label": "Customer success headcount", "category": "headcount_addon"},
        ]});
        let plan = resolve_emit_plan(&phase3, &phase4);
        assert_eq!(plan.segment_count, 2);
        assert_eq!(plan.adopted_add_ons, vec!["Customer success headcount".to_string()]);
    }

    #[test]
    fn missing_data_defaults_to_one_segment_and_no_add_ons() {
        let plan = resolve_emit_plan(&json!({}), &json!({}));
        assert_eq!(plan.segment_count, 1);
        assert!(plan.adopted_add_ons.is_empty());
    }

    #[test]
    fn sheet_mappings_is_preferred_over_segment_mapping() {
        let phase3 = json!({
            "sheet_mappings": [
                {"sheet": "s1", "segment": "a", "purpose": "revenue_model"},
                {"sheet": "s2", "segment": "a", "purpose": "cost_detail"},
                {"sheet": "s3", "segment": "b", "purpose": "revenue_model"},
            ],
            "segment_mapping": [{"segment": "a", "sheet": "s1"}],
        });
        let plan = resolve_emit_plan(&phase3, &json!({}));
        assert_eq!(plan.segment_count, 2);
    }
}
