//! Resolves what the (out of scope) spreadsheet writer needs once Phase 3
//! and Phase 4 have run: how many segment sheets to populate, which
//! non-baseline cells were adopted as add-on lines, and how the 5-year
//! revenue line splits across those segments without rounding loss. Actually
//! writing a workbook is a collaborator's job, reached through
//! [`SpreadsheetDriver`].

use crate::recalc::{compute_pl, ParamMap, RecalcResult};
use modelforge_agents::{resolve_emit_plan, EmitPlan};
use serde_json::Value;

/// Splits `total` into `n` non-negative integers that sum back to `total`
/// exactly, handing the remainder to the first segments rather than
/// losing or inventing a yen through naive rounding.
#[must_use]
pub fn distribute_largest_remainder(total: i64, n: usize) -> Vec<i64> {
    if n == 0 {
        return Vec::new();
    }
    let n = n as i64;
    let base = total / n;
    let remainder = total - base * n;
    (0..n).map(|i| base + i64::from(i < remainder)).collect()
}

/// Per-segment revenue for each projection year: `segment_revenue[segment][year]`.
#[must_use]
pub fn segment_revenue_split(pl: &RecalcResult, segment_count: usize) -> Vec<Vec<i64>> {
    let per_year: Vec<Vec<i64>> = pl.pl_summary.revenue.iter().map(|&total| distribute_largest_remainder(total, segment_count)).collect();
    (0..segment_count).map(|seg| per_year.iter().map(|year| year[seg]).collect()).collect()
}

#[derive(Debug, Clone)]
pub struct EmitOutput {
    pub plan: EmitPlan,
    pub segment_revenue: Vec<Vec<i64>>,
    pub pl: RecalcResult,
}

/// Combines the Phase 3/4 emit plan with a base-scenario recalculation to
/// produce everything the writer needs to populate a workbook.
#[must_use]
pub fn resolve(phase3_result: &Value, phase4_result: &Value, parameters: &ParamMap) -> EmitOutput {
    let plan = resolve_emit_plan(phase3_result, phase4_result);
    let pl = compute_pl(parameters);
    let segment_revenue = segment_revenue_split(&pl, plan.segment_count);
    EmitOutput { plan, segment_revenue, pl }
}

/// The seam between this core and the spreadsheet template writer, which
/// is out of scope here: given a resolved [`EmitOutput`], produce the
/// bytes of a workbook. No implementation of this trait ships in this
/// crate.
pub trait SpreadsheetDriver: Send + Sync {
    fn write(&self, project_name: &str, output: &EmitOutput) -> Result<Vec<u8>, String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn largest_remainder_distribution_sums_to_total() {
        let parts = distribute_largest_remainder(100, 3);
        assert_eq!(parts.iter().sum::<i64>(), 100);
        assert_eq!(parts, vec![34, 33, 33]);
    }

    #[test]
    fn single_segment_gets_the_whole_total() {
        assert_eq!(distribute_largest_remainder(100, 1), vec![100]);
    }

    #[test]
    fn segment_revenue_split_matches_yearly_totals() {
        let pl = compute_pl(&ParamMap::new());
        let split = segment_revenue_split(&pl, 3);
        assert_eq!(split.len(), 3);
        for year in 0..5 {
            let sum: i64 = split.iter().map(|seg| seg[year]).sum();
            assert_eq!(sum, pl.pl_summary.revenue[year]);
        }
    }
}
