//! Document truncation strategies for the two phases that see the raw
//! document text directly.

const PHASE2_MAX_CHARS: usize = 30_000;
const PHASE2_HEAD_RATIO: f64 = 0.70;
const PHASE2_TAIL_RATIO: f64 = 0.25;
const PHASE2_MARKER: &str = "[...中略...]";

const PHASE5_MAX_CHARS: usize = 10_000;
const PHASE5_MARKER: &str = "[...以降省略...]";

/// Phase 2 sees the head and tail of the document (70%/25% of the 30,000
/// char budget) with a marker spliced in between, so the model retains
/// both the opening framing and the closing numbers of a long plan.
#[must_use]
pub fn truncate_for_phase2(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= PHASE2_MAX_CHARS {
        return text.to_string();
    }
    let head_len = (PHASE2_MAX_CHARS as f64 * PHASE2_HEAD_RATIO) as usize;
    let tail_len = (PHASE2_MAX_CHARS as f64 * PHASE2_TAIL_RATIO) as usize;
    let head: String = chars[..head_len].iter().collect();
    let tail: String = chars[chars.len() - tail_len..].iter().collect();
    format!("{head}\n{PHASE2_MARKER}\n{tail}")
}

/// Phase 5 only ever sees the first 10,000 characters; the tail of a long
/// plan rarely carries extractable parameters.
#[must_use]
pub fn truncate_for_phase5(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= PHASE5_MAX_CHARS {
        return text.to_string();
    }
    let head: String = chars[..PHASE5_MAX_CHARS].iter().collect();
    format!("{head}\n{PHASE5_MARKER}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_document_passes_through_unchanged() {
        let text = "a short plan";
        assert_eq!(truncate_for_phase2(text), text);
        assert_eq!(truncate_for_phase5(text), text);
    }

    #[test]
    fn phase2_splices_marker_between_head_and_tail() {
        let text = "x".repeat(40_000);
        let truncated = truncate_for_phase2(&text);
        assert!(truncated.contains("[...中略...]"));
        assert!(truncated.len() < text.len());
    }

    #[test]
    fn phase5_truncates_to_head_only() {
        let text = "y".repeat(40_000);
        let truncated = truncate_for_phase5(&text);
        assert!(truncated.ends_with("[...以降省略...]"));
        assert!(truncated.len() < text.len());
    }
}
