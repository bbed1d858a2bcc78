//! Extracts well-formed JSON out of raw LLM text.
//!
//! Order of attempts: strip a markdown code fence, locate the first `{`,
//! try a strict parse. If that fails and the provider reported a
//! `max_tokens` stop (the response was cut off mid-structure), try to
//! repair the truncation by walking back to the last syntactically sound
//! point and closing the open braces/brackets. Otherwise fall back to a
//! small set of regex extraction patterns. Everything that doesn't parse
//! after all of that is a [`JsonGuardError`].

use super::warning::GuardWarning;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    Other,
}

#[derive(Debug, thiserror::Error)]
pub enum JsonGuardError {
    #[error("no JSON object found in response")]
    NoObjectFound,
    #[error("response was not valid JSON: {0}")]
    InvalidJson(String),
}

pub struct GuardedOutput {
    pub value: Value,
    pub warnings: Vec<GuardWarning>,
}

const FENCE_JSON: &str = r"(?s)```json\s*(.*?)\s*```";
const FENCE_PLAIN: &str = r"(?s)```\s*(.*?)\s*```";
const BRACE_SPAN: &str = r"(?s)\{.*\}";

static RE_FENCE_JSON: Lazy<Regex> = Lazy::new(|| Regex::new(FENCE_JSON).unwrap());
static RE_FENCE_PLAIN: Lazy<Regex> = Lazy::new(|| Regex::new(FENCE_PLAIN).unwrap());
static RE_BRACE_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(BRACE_SPAN).unwrap());

/// The set of wrapper keys a single-key top-level object is auto-unwrapped
/// from, so `{"result": {...}}` and `{...}` are treated the same.
const WRAPPER_KEYS: &[&str] = &["result", "response", "data", "output", "analysis", "design"];

pub fn enforce_json(raw: &str, stop_reason: StopReason) -> Result<GuardedOutput, JsonGuardError> {
    let stripped = strip_fence(raw);
    let mut warnings = Vec::new();

    let candidate = match stripped.find('{') {
        Some(idx) => &stripped[idx..],
        None => {
            return try_extract(raw, &mut warnings);
        }
    };

    match serde_json::from_str::<Value>(candidate) {
        Ok(value) => Ok(GuardedOutput {
            value: auto_unwrap(value),
            warnings,
        }),
        Err(e) => {
            if stop_reason == StopReason::MaxTokens {
                if let Some(value) = repair_truncated(candidate) {
                    warnings.push(GuardWarning::TruncationRepaired);
                    return Ok(GuardedOutput {
                        value: auto_unwrap(value),
                        warnings,
                    });
                }
            }
            try_extract(raw, &mut warnings).map_err(|_| JsonGuardError::InvalidJson(e.to_string()))
        }
    }
}

fn strip_fence(raw: &str) -> &str {
    raw.trim()
}

/// Auto-unwrap a single well-known wrapper key at the top level.
fn auto_unwrap(value: Value) -> Value {
    if let Value::Object(ref map) = value {
        if map.len() == 1 {
            if let Some((key, inner)) = map.iter().next() {
                if WRAPPER_KEYS.contains(&key.as_str()) {
                    return inner.clone();
                }
            }
        }
    }
    value
}

fn try_extract(raw: &str, warnings: &mut Vec<GuardWarning>) -> Result<GuardedOutput, JsonGuardError> {
    for re in [&*RE_FENCE_JSON, &*RE_FENCE_PLAIN] {
        if let Some(caps) = re.captures(raw) {
            if let Some(m) = caps.get(1) {
                if let Ok(value) = serde_json::from_str::<Value>(m.as_str()) {
                    warnings.push(GuardWarning::RegexExtractionFallback);
                    return Ok(GuardedOutput {
                        value: auto_unwrap(value),
                        warnings: warnings.clone(),
                    });
                }
            }
        }
    }
    if let Some(m) = RE_BRACE_SPAN.find(raw) {
        if let Ok(value) = serde_json::from_str::<Value>(m.as_str()) {
            warnings.push(GuardWarning::RegexExtractionFallback);
            return Ok(GuardedOutput {
                value: auto_unwrap(value),
                warnings: warnings.clone(),
            });
        }
    }
    Err(JsonGuardError::NoObjectFound)
}

/// Walk `text` tracking string/escape/brace/bracket state, recording every
/// position that is a syntactically sound trim point (i.e. not inside a
/// string, at depth >= 0). Try the most recent candidates first, closing
/// whatever braces/brackets are still open at that point.
fn repair_truncated(text: &str) -> Option<Value> {
    let chars: Vec<char> = text.chars().collect();
    let mut in_string = false;
    let mut escape = false;
    let mut brace_depth: i32 = 0;
    let mut bracket_depth: i32 = 0;
    let mut trim_points: Vec<(usize, i32, i32)> = Vec::new();

    for (i, &c) in chars.iter().enumerate() {
        if escape {
            escape = false;
            continue;
        }
        match c {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => brace_depth += 1,
            '}' if !in_string => brace_depth -= 1,
            '[' if !in_string => bracket_depth += 1,
            ']' if !in_string => bracket_depth -= 1,
            ',' if !in_string => trim_points.push((i, brace_depth, bracket_depth)),
            _ => {}
        }
        if !in_string && matches!(c, '}' | ']') {
            trim_points.push((i + 1, brace_depth, bracket_depth));
        }
    }

    for &(pos, bd, kd) in trim_points.iter().rev().take(30) {
        if bd < 0 || kd < 0 {
            continue;
        }
        let mut attempt: String = chars[..pos].iter().collect();
        // a trailing comma trim point needs the comma itself dropped
        if attempt.trim_end().ends_with(',') {
            let trimmed = attempt.trim_end();
            attempt = trimmed[..trimmed.len() - 1].to_string();
        }
        attempt.push_str(&"]".repeat(kd as usize));
        attempt.push_str(&"}".repeat(bd as usize));
        if let Ok(value) = serde_json::from_str::<Value>(&attempt) {
            return Some(value);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_plain_object() {
        let out = enforce_json(r#"{"a": 1}"#, StopReason::EndTurn).unwrap();
        assert_eq!(out.value, json!({"a": 1}));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn strips_leading_prose_before_brace() {
        let out = enforce_json(r#"Here is the result: {"a": 1}"#, StopReason::EndTurn).unwrap();
        assert_eq!(out.value, json!({"a": 1}));
    }

    #[test]
    fn unwraps_single_wrapper_key() {
        let out = enforce_json(r#"{"result": {"a": 1}}"#, StopReason::EndTurn).unwrap();
        assert_eq!(out.value, json!({"a": 1}));
    }

    #[test]
    fn extracts_from_json_fence_when_no_leading_brace_on_strict_path() {
        let raw = "some preamble\n```json\n{\"a\": 1}\n```\ntrailing";
        let out = enforce_json(raw, StopReason::EndTurn).unwrap();
        assert_eq!(out.value, json!({"a": 1}));
    }

    #[test]
    fn repairs_truncated_object_on_max_tokens() {
        let raw = r#"{"a": 1, "b": [1, 2, 3"#;
        let out = enforce_json(raw, StopReason::MaxTokens).unwrap();
        assert!(out.warnings.contains(&GuardWarning::TruncationRepaired));
        assert_eq!(out.value["a"], json!(1));
    }

    #[test]
    fn does_not_repair_truncation_without_max_tokens_stop() {
        let raw = r#"{"a": 1, "b": [1, 2, 3"#;
        let result = enforce_json(raw, StopReason::EndTurn);
        assert!(result.is_err());
    }

    #[test]
    fn no_brace_at_all_is_an_error() {
        let result = enforce_json("no json here", StopReason::EndTurn);
        assert!(result.is_err());
    }
}
