//! Guarantees Phase 5 never returns zero extractions for a non-empty
//! catalog: if the guarded output has none, synthesise a default, low
//! confidence entry per catalog item rather than let the phase fail
//! outright.

use super::warning::GuardWarning;
use serde_json::{json, Value};

/// `extractions` is the array the LLM returned (possibly empty);
/// `catalog_items` are the labels of the catalog entries that were
/// supposed to be extracted. Returns the (possibly synthesised) array and
/// the warnings raised for any synthesised entries.
#[must_use]
pub fn ensure_completeness(
    extractions: Vec<Value>,
    catalog_items: &[String],
) -> (Vec<Value>, Vec<GuardWarning>) {
    if !extractions.is_empty() {
        return (extractions, Vec::new());
    }
    let synthesized: Vec<Value> = catalog_items
        .iter()
        .map(|item| {
            json!({
                "label": item,
                "value": null,
                "source": "default",
                "confidence": 0.1,
            })
        })
        .collect();
    let warnings = vec![GuardWarning::SourceDefault; synthesized.len()];
    (synthesized, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_extractions_pass_through_unchanged() {
        let extractions = vec![json!({"label": "revenue", "value": 100})];
        let (result, warnings) = ensure_completeness(extractions.clone(), &["revenue".into()]);
        assert_eq!(result, extractions);
        assert!(warnings.is_empty());
    }

    #[test]
    fn empty_extractions_synthesize_one_per_catalog_item() {
        let catalog = vec!["revenue".to_string(), "cogs".to_string()];
        let (result, warnings) = ensure_completeness(Vec::new(), &catalog);
        assert_eq!(result.len(), 2);
        assert_eq!(warnings.len(), 2);
        assert_eq!(result[0]["source"], "default");
        assert_eq!(result[0]["confidence"], 0.1);
    }
}
