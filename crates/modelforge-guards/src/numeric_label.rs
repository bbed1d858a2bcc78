//! Catches a common failure mode: an LLM returns a bare formatted number
//! (optionally with a Japanese magnitude suffix or a currency/percent
//! sign) where a descriptive label was expected.

use super::warning::GuardWarning;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_NUMERIC_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d[\d,\.]*[万億千百]?[円%]?$").unwrap());

pub const NEEDS_REVIEW: &str = "NEEDS_REVIEW";

/// Bare-number check without the sentinel side-effect, for callers that
/// have a real replacement label on hand (a catalog entry, a sibling
/// phase's cell assignment) instead of the generic sentinel.
#[must_use]
pub fn is_numeric_label(label: &str) -> bool {
    RE_NUMERIC_LABEL.is_match(label)
}

/// If `label` matches the bare-number pattern, return the sentinel
/// replacement and a warning; otherwise return the label unchanged.
#[must_use]
pub fn scrub_numeric_labels(label: &str) -> (String, Option<GuardWarning>) {
    if is_numeric_label(label) {
        (NEEDS_REVIEW.to_string(), Some(GuardWarning::NumericLabel))
    } else {
        (label.to_string(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_number_is_scrubbed() {
        let (label, warning) = scrub_numeric_labels("12345");
        assert_eq!(label, NEEDS_REVIEW);
        assert_eq!(warning, Some(GuardWarning::NumericLabel));
    }

    #[test]
    fn number_with_yen_and_magnitude_is_scrubbed() {
        let (label, _) = scrub_numeric_labels("1,200万円");
        assert_eq!(label, NEEDS_REVIEW);
    }

    #[test]
    fn percent_is_scrubbed() {
        let (label, _) = scrub_numeric_labels("12.5%");
        assert_eq!(label, NEEDS_REVIEW);
    }

    #[test]
    fn descriptive_label_passes_through() {
        let (label, warning) = scrub_numeric_labels("Subscription revenue");
        assert_eq!(label, "Subscription revenue");
        assert_eq!(warning, None);
    }

    #[test]
    fn is_numeric_label_matches_without_side_effect() {
        assert!(is_numeric_label("12345"));
        assert!(is_numeric_label("1,200万円"));
        assert!(!is_numeric_label("Subscription revenue"));
    }
}
