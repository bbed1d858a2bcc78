//! Synchronous recalculation: folds Phase 5 extractions, caller-provided
//! parameter overrides, and a scenario multiplier into a 5-year P&L. No LLM
//! call and no heavy computation, so a slider drag can call this on every
//! tick and still land comfortably under half a second.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Phase 5 extraction label keywords (English and Japanese) mapped to the
/// driver key `compute_pl` understands. Checked in order; the first
/// keyword contained in a lowercased label wins. This table and its
/// ordering are carried over verbatim from the system this was distilled
/// from, since the keyword classifier is a preserved behaviour rather than
/// a free redesign.
const PARAM_KEY_MAP: &[(&str, &str)] = &[
    ("売上高", "revenue_fy1"),
    ("売上", "revenue_fy1"),
    ("revenue", "revenue_fy1"),
    ("成長率", "growth_rate"),
    ("growth", "growth_rate"),
    ("原価率", "cogs_rate"),
    ("原価", "cogs_rate"),
    ("cogs", "cogs_rate"),
    ("販管費", "opex_base"),
    ("opex", "opex_base"),
    ("人件費", "opex_base"),
    ("opex増加率", "opex_growth"),
];

const REVENUE_KEYWORDS: &[&str] = &["revenue", "売上", "単価", "price"];
const COST_KEYWORDS: &[&str] = &["cost", "原価", "費用", "opex"];

const DEFAULT_REVENUE_FY1: f64 = 100_000_000.0;
const DEFAULT_GROWTH_RATE: f64 = 0.3;
const DEFAULT_COGS_RATE: f64 = 0.3;
const DEFAULT_OPEX_BASE: f64 = 80_000_000.0;
const DEFAULT_OPEX_GROWTH: f64 = 0.1;

const PROJECTION_YEARS: usize = 5;

pub type ParamMap = HashMap<String, f64>;

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlSummary {
    pub revenue: Vec<i64>,
    pub cogs: Vec<i64>,
    pub gross_profit: Vec<i64>,
    pub opex: Vec<i64>,
    pub operating_profit: Vec<i64>,
    pub fcf: Vec<i64>,
    pub cumulative_fcf: Vec<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Kpis {
    pub break_even_year: Option<String>,
    pub cumulative_break_even_year: Option<String>,
    pub revenue_cagr: f64,
    pub fy5_op_margin: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RecalcResult {
    pub pl_summary: PlSummary,
    pub kpis: Kpis,
    pub scenario: String,
    pub source_params: ParamMap,
}

/// Converts a Phase 5 `extractions` array into driver-key parameters,
/// matching each extraction's lowercased label against [`PARAM_KEY_MAP`].
/// Extractions with no numeric value, or whose label matches no keyword,
/// contribute nothing.
#[must_use]
pub fn extract_params_from_phase5(phase5_result: &Value) -> ParamMap {
    let mut params = ParamMap::new();
    let Some(extractions) = phase5_result.get("extractions").and_then(Value::as_array) else {
        return params;
    };

    for extraction in extractions {
        let label = extraction
            .get("label")
            .and_then(Value::as_str)
            .or_else(|| extraction.get("key").and_then(Value::as_str))
            .unwrap_or_default()
            .to_lowercase();

        let Some(value) = numeric_value(extraction.get("value")) else { continue };

        for (keyword, driver_key) in PARAM_KEY_MAP {
            if label.contains(&keyword.to_lowercase()) {
                params.insert((*driver_key).to_string(), value);
                break;
            }
        }
    }

    params
}

fn numeric_value(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Applies `best`/`worst` multipliers to revenue- and cost-classified
/// parameters; `base` passes parameters through untouched.
#[must_use]
pub fn apply_scenario_multipliers(parameters: &ParamMap, scenario: &str, best: &ParamMap, worst: &ParamMap) -> ParamMap {
    if scenario == "base" {
        return parameters.clone();
    }
    let mult = match scenario {
        "best" => best,
        "worst" => worst,
        _ => return parameters.clone(),
    };
    if mult.is_empty() {
        return parameters.clone();
    }

    let mut adjusted = parameters.clone();
    for (key, value) in adjusted.iter_mut() {
        let key_lower = key.to_lowercase();
        if REVENUE_KEYWORDS.iter().any(|w| key_lower.contains(w)) {
            *value *= mult.get("revenue").copied().unwrap_or(1.0);
        } else if COST_KEYWORDS.iter().any(|w| key_lower.contains(w)) {
            *value *= mult.get("cost").copied().unwrap_or(1.0);
        }
    }
    adjusted
}

#[must_use]
pub fn default_best_multipliers() -> ParamMap {
    ParamMap::from([("revenue".to_string(), 1.2), ("cost".to_string(), 0.9)])
}

#[must_use]
pub fn default_worst_multipliers() -> ParamMap {
    ParamMap::from([("revenue".to_string(), 0.8), ("cost".to_string(), 1.15)])
}

/// Runs the 5-year P&L recurrence: revenue grows at `growth_rate`, COGS is
/// a fixed fraction of revenue, opex grows independently at `opex_growth`,
/// and FCF is a simplified 90% of operating profit. All monetary values
/// round to the nearest integer before being returned.
#[must_use]
pub fn compute_pl(parameters: &ParamMap) -> RecalcResult {
    let revenue_fy1 = parameters.get("revenue_fy1").copied().unwrap_or(DEFAULT_REVENUE_FY1);
    let growth_rate = parameters.get("growth_rate").copied().unwrap_or(DEFAULT_GROWTH_RATE);
    let cogs_rate = parameters.get("cogs_rate").copied().unwrap_or(DEFAULT_COGS_RATE);
    let opex_base = parameters.get("opex_base").copied().unwrap_or(DEFAULT_OPEX_BASE);
    let opex_growth = parameters.get("opex_growth").copied().unwrap_or(DEFAULT_OPEX_GROWTH);

    let mut pl = PlSummary::default();
    let mut cumulative = 0.0_f64;

    for year in 0..PROJECTION_YEARS {
        let rev = revenue_fy1 * (1.0 + growth_rate).powi(year as i32);
        let cost = rev * cogs_rate;
        let gp = rev - cost;
        let opex = opex_base * (1.0 + opex_growth).powi(year as i32);
        let op = gp - opex;
        let fcf = op * 0.9;
        cumulative += fcf;

        pl.revenue.push(rev.round() as i64);
        pl.cogs.push(cost.round() as i64);
        pl.gross_profit.push(gp.round() as i64);
        pl.opex.push(opex.round() as i64);
        pl.operating_profit.push(op.round() as i64);
        pl.fcf.push(fcf.round() as i64);
        pl.cumulative_fcf.push(cumulative.round() as i64);
    }

    let break_even_year = pl.operating_profit.iter().position(|&op| op > 0).map(|i| format!("FY{}", i + 1));
    let cumulative_break_even_year = pl.cumulative_fcf.iter().position(|&cf| cf > 0).map(|i| format!("FY{}", i + 1));

    let revenue_cagr = if pl.revenue[0] > 0 {
        (pl.revenue[PROJECTION_YEARS - 1] as f64 / pl.revenue[0] as f64).powf(1.0 / (PROJECTION_YEARS as f64 - 1.0)) - 1.0
    } else {
        0.0
    };
    let fy5_op_margin = if pl.revenue[PROJECTION_YEARS - 1] > 0 {
        pl.operating_profit[PROJECTION_YEARS - 1] as f64 / pl.revenue[PROJECTION_YEARS - 1] as f64
    } else {
        0.0
    };

    RecalcResult {
        pl_summary: pl,
        kpis: Kpis {
            break_even_year,
            cumulative_break_even_year,
            revenue_cagr: round4(revenue_cagr),
            fy5_op_margin: round4(fy5_op_margin),
        },
        scenario: "base".to_string(),
        source_params: parameters.clone(),
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Merges the Phase 5 baseline, caller-supplied parameters, and edited
/// cells (in ascending precedence), applies the scenario multipliers, and
/// runs [`compute_pl`].
#[must_use]
pub fn recalc(
    phase5_result: Option<&Value>,
    parameters: &ParamMap,
    edited_cells: &ParamMap,
    scenario: &str,
    best_multipliers: &ParamMap,
    worst_multipliers: &ParamMap,
) -> RecalcResult {
    let mut merged = phase5_result.map(extract_params_from_phase5).unwrap_or_default();
    merged.extend(parameters.clone());
    merged.extend(edited_cells.clone());

    let adjusted = apply_scenario_multipliers(&merged, scenario, best_multipliers, worst_multipliers);
    let mut result = compute_pl(&adjusted);
    result.scenario = scenario.to_string();
    result.source_params = merged;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_bilingual_revenue_keyword() {
        let phase5 = json!({"extractions": [{"label": "売上高", "value": 50_000_000}]});
        let params = extract_params_from_phase5(&phase5);
        assert_eq!(params.get("revenue_fy1"), Some(&50_000_000.0));
    }

    #[test]
    fn first_matching_keyword_wins() {
        let phase5 = json!({"extractions": [{"label": "opex増加率", "value": 0.2}]});
        let params = extract_params_from_phase5(&phase5);
        // "opex" appears before "opex増加率" in the table, but the label only
        // contains "opex増加率" as a substring match target - "opex" is also
        // contained, and table order is checked top-to-bottom, so "opex"
        // (opex_base) wins over the more specific later entry.
        assert_eq!(params.get("opex_base"), Some(&0.2));
    }

    #[test]
    fn non_numeric_value_is_skipped() {
        let phase5 = json!({"extractions": [{"label": "revenue", "value": "unknown"}]});
        let params = extract_params_from_phase5(&phase5);
        assert!(params.is_empty());
    }

    #[test]
    fn base_scenario_leaves_parameters_untouched() {
        let params = ParamMap::from([("revenue_fy1".to_string(), 100.0)]);
        let adjusted = apply_scenario_multipliers(&params, "base", &default_best_multipliers(), &default_worst_multipliers());
        assert_eq!(adjusted.get("revenue_fy1"), Some(&100.0));
    }

    #[test]
    fn best_scenario_scales_revenue_and_cost_keys() {
        let params = ParamMap::from([("revenue_fy1".to_string(), 100.0), ("cogs_rate".to_string(), 0.5)]);
        let adjusted = apply_scenario_multipliers(&params, "best", &default_best_multipliers(), &default_worst_multipliers());
        assert!((adjusted["revenue_fy1"] - 120.0).abs() < 1e-9);
        assert!((adjusted["cogs_rate"] - 0.45).abs() < 1e-9);
    }

    #[test]
    fn compute_pl_uses_defaults_when_no_parameters_given() {
        let result = compute_pl(&ParamMap::new());
        assert_eq!(result.pl_summary.revenue.len(), 5);
        assert_eq!(result.pl_summary.revenue[0], 100_000_000);
    }

    #[test]
    fn break_even_year_is_none_when_never_profitable() {
        let params = ParamMap::from([
            ("revenue_fy1".to_string(), 1.0),
            ("opex_base".to_string(), 1_000_000_000.0),
            ("opex_growth".to_string(), 0.0),
            ("growth_rate".to_string(), 0.0),
            ("cogs_rate".to_string(), 0.1),
        ]);
        let result = compute_pl(&params);
        assert_eq!(result.kpis.break_even_year, None);
    }

    #[test]
    fn recalc_merges_base_params_then_caller_params_then_edits() {
        let phase5 = json!({"extractions": [{"label": "revenue", "value": 10.0}]});
        let caller_params = ParamMap::from([("revenue_fy1".to_string(), 20.0)]);
        let edits = ParamMap::from([("revenue_fy1".to_string(), 30.0)]);
        let result = recalc(Some(&phase5), &caller_params, &edits, "base", &default_best_multipliers(), &default_worst_multipliers());
        assert_eq!(result.source_params.get("revenue_fy1"), Some(&30.0));
    }
}
