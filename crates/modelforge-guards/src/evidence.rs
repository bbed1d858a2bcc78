//! Verifies that a field's claimed supporting quote actually appears in
//! the source document, either verbatim or as a close fuzzy match.

use super::warning::GuardWarning;
use std::collections::HashSet;

const TOKEN_OVERLAP_THRESHOLD: f64 = 0.6;

/// `None` evidence (or empty string) is reported as `EvidenceMissing`.
/// Non-empty evidence that neither appears verbatim in `document` nor
/// clears the token-overlap threshold is `EvidenceNotFoundInDocument`.
pub fn verify_evidence(evidence: Option<&str>, document: &str) -> Option<GuardWarning> {
    let evidence = match evidence {
        Some(e) if !e.trim().is_empty() => e.trim(),
        _ => return Some(GuardWarning::EvidenceMissing),
    };
    let evidence_lower = evidence.to_lowercase();
    let document_lower = document.to_lowercase();

    if document_lower.contains(&evidence_lower) {
        return None;
    }

    if fuzzy_match(&evidence_lower, &document_lower) {
        return None;
    }

    Some(GuardWarning::EvidenceNotFoundInDocument)
}

fn fuzzy_match(evidence_lower: &str, document_lower: &str) -> bool {
    let evidence_tokens: HashSet<&str> = evidence_lower.split_whitespace().collect();
    if evidence_tokens.is_empty() {
        return false;
    }
    let document_tokens: HashSet<&str> = document_lower.split_whitespace().collect();
    let overlap = evidence_tokens.intersection(&document_tokens).count();
    let ratio = overlap as f64 / evidence_tokens.len() as f64;
    ratio >= TOKEN_OVERLAP_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_evidence_is_flagged() {
        assert_eq!(verify_evidence(None, "doc text"), Some(GuardWarning::EvidenceMissing));
        assert_eq!(verify_evidence(Some("  "), "doc text"), Some(GuardWarning::EvidenceMissing));
    }

    #[test]
    fn verbatim_substring_passes() {
        assert_eq!(verify_evidence(Some("annual revenue"), "our annual revenue grew"), None);
    }

    #[test]
    fn close_paraphrase_passes_token_overlap() {
        let doc = "The company reported annual revenue growth of 12 percent last year";
        assert_eq!(verify_evidence(Some("annual revenue growth 12 percent"), doc), None);
    }

    #[test]
    fn unrelated_text_fails() {
        let doc = "The company sells industrial adhesives";
        assert_eq!(
            verify_evidence(Some("quarterly subscriber churn doubled"), doc),
            Some(GuardWarning::EvidenceNotFoundInDocument)
        );
    }

    #[test]
    fn case_differences_are_ignored() {
        assert_eq!(verify_evidence(Some("Annual Revenue"), "our annual revenue grew"), None);
        assert_eq!(verify_evidence(Some("  Annual Revenue  "), "ANNUAL REVENUE was up"), None);
    }
}
