//! Fixed point deductions applied to a phase result's confidence score for
//! each distinct warning raised while extracting it.

use super::warning::GuardWarning;

fn penalty(warning: GuardWarning) -> f64 {
    match warning {
        GuardWarning::EvidenceMissing => -0.4,
        GuardWarning::EvidenceNotFoundInDocument => -0.3,
        GuardWarning::SourceDefault => -0.2,
        GuardWarning::SourceInferred => -0.1,
        GuardWarning::NumericLabel => -0.15,
        GuardWarning::TruncationRepaired | GuardWarning::RegexExtractionFallback => 0.0,
    }
}

/// Sum each warning's fixed penalty against `base_confidence` and clamp the
/// result to `[0.0, 1.0]`.
#[must_use]
pub fn apply_penalties(base_confidence: f64, warnings: &[GuardWarning]) -> f64 {
    let total: f64 = warnings.iter().map(|w| penalty(*w)).sum();
    (base_confidence + total).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_warnings_leaves_confidence_untouched() {
        assert_eq!(apply_penalties(0.9, &[]), 0.9);
    }

    #[test]
    fn stacked_penalties_clamp_at_zero() {
        let warnings = vec![GuardWarning::EvidenceMissing, GuardWarning::EvidenceMissing, GuardWarning::EvidenceMissing];
        assert_eq!(apply_penalties(0.5, &warnings), 0.0);
    }

    #[test]
    fn confidence_never_exceeds_one() {
        assert_eq!(apply_penalties(1.0, &[]), 1.0);
    }
}
