//! Exhaustive warning vocabulary attached to a `PhaseResult`, used to key
//! confidence penalties instead of matching on free-form strings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GuardWarning {
    /// A field that should carry supporting evidence had none.
    EvidenceMissing,
    /// Evidence was present but did not fuzzy-match the source document.
    EvidenceNotFoundInDocument,
    /// A value was synthesised because the field was absent from output.
    SourceDefault,
    /// A value could not be extracted and was inferred from context.
    SourceInferred,
    /// A label field looked like a bare formatted number rather than text.
    NumericLabel,
    /// The raw response needed truncation repair to parse as JSON.
    TruncationRepaired,
    /// Output was recovered via the regex extraction fallback.
    RegexExtractionFallback,
}
