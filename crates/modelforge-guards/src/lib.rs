//! Absolute rules enforced over raw LLM output before a phase result is
//! accepted: extract well-formed JSON out of whatever text came back,
//! verify claimed evidence actually appears in the source document, and
//! penalise confidence for anything that had to be guessed or repaired.

pub mod completeness;
pub mod confidence;
pub mod evidence;
pub mod json_guard;
pub mod numeric_label;
pub mod truncation;
pub mod warning;

pub use completeness::ensure_completeness;
pub use confidence::apply_penalties;
pub use evidence::verify_evidence;
pub use json_guard::{enforce_json, StopReason};
pub use numeric_label::{is_numeric_label, scrub_numeric_labels};
pub use truncation::{truncate_for_phase2, truncate_for_phase5};
pub use warning::GuardWarning;
