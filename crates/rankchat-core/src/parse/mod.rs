//! Section extraction for assistant responses.
//!
//! Raw model output arrives as one opaque string that may interleave a
//! reasoning preamble, the actual answer, and a templated promotional
//! footer. [`extract`] splits it into those three sections deterministically
//! so the UI can gate each behind its own panel.

mod promotion;
mod reasoning;

pub use reasoning::{MatchOutcome, Matcher, SplitMatch, SPLIT_MATCHERS};

use reasoning::{strip_bracket_reasoning, strip_residual_answer_label, strip_tagged_reasoning};
use tracing::debug;

/// Below this trimmed length the extracted main content is considered empty.
pub const MIN_MAIN_CONTENT_LEN: usize = 5;

/// Reasoning shorter than this cannot justify an empty main content.
pub const MIN_REASONING_LEN: usize = 20;

/// The three sections of a parsed assistant response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedSections {
    /// Model reasoning preamble, when one was recognized.
    pub reasoning: Option<String>,
    /// The answer body. Never empty for a non-empty input.
    pub main_content: String,
    /// Promotional footer, split off from the answer body.
    pub promotion: Option<String>,
}

impl ParsedSections {
    fn raw(text: &str) -> Self {
        Self {
            reasoning: None,
            main_content: text.to_string(),
            promotion: None,
        }
    }
}

/// Splits a raw response into reasoning, main content, and promotion.
///
/// Extraction order:
/// 1. Inline `<think>`/`<thinking>` tag blocks are removed wherever they
///    appear; their contents seed the reasoning. This runs unconditionally
///    and needs no answer marker.
/// 2. `[Reasoning]…[/Reasoning]` blocks, same treatment.
/// 3. The label/delimiter matchers run in priority order on the remaining
///    text; the first non-trivial split wins and the cascade stops.
/// 4. The promotional footer is split off the main content. This is
///    independent of whether any reasoning matched.
///
/// If the result would leave almost nothing to show (main content under
/// [`MIN_MAIN_CONTENT_LEN`] with reasoning under [`MIN_REASONING_LEN`]),
/// extraction is considered a false positive and the raw text is returned
/// unchanged as main content.
pub fn extract(text: &str) -> ParsedSections {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ParsedSections::raw(text);
    }

    let mut reasoning_blocks: Vec<String> = Vec::new();
    let mut main = trimmed.to_string();
    let mut extracted = false;

    if let Some((reduced, block)) = strip_tagged_reasoning(&main) {
        if !block.is_empty() {
            reasoning_blocks.push(block);
        }
        main = reduced;
        extracted = true;
    }

    if let Some((reduced, block)) = strip_bracket_reasoning(&main) {
        if !block.is_empty() {
            reasoning_blocks.push(block);
        }
        main = reduced;
        extracted = true;
    }

    for matcher in SPLIT_MATCHERS {
        match (matcher.apply)(&main) {
            MatchOutcome::Accepted(split) => {
                debug!(matcher = matcher.name, "reasoning split accepted");
                reasoning_blocks.push(split.reasoning);
                main = split.main;
                extracted = true;
                break;
            }
            MatchOutcome::Trivial => {
                debug!(matcher = matcher.name, "reasoning split rejected as trivial");
            }
            MatchOutcome::NoMatch => {}
        }
    }

    // An answer label is only an extraction artifact when something was
    // actually split off; a bare labeled message stays intact.
    if extracted {
        main = strip_residual_answer_label(&main);
    }

    let (main, promo) = promotion::split_promotion(&main);
    let main = main.trim().to_string();

    let reasoning_text = reasoning_blocks.join("\n\n");
    if main.len() < MIN_MAIN_CONTENT_LEN && reasoning_text.len() < MIN_REASONING_LEN {
        return ParsedSections::raw(text);
    }

    ParsedSections {
        reasoning: (!reasoning_text.is_empty()).then_some(reasoning_text),
        main_content: main,
        promotion: promo,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passes_through() {
        let parsed = extract("Just a direct answer about meta descriptions.");
        assert_eq!(parsed.reasoning, None);
        assert_eq!(
            parsed.main_content,
            "Just a direct answer about meta descriptions."
        );
        assert_eq!(parsed.promotion, None);
    }

    #[test]
    fn test_full_cascade_end_to_end() {
        let raw = "**Reasoning:** Consider search intent.\n\n**Answer:** Focus on long-tail keywords.\n\n---\n💡 **Need Professional SEO Help?** consult Rabbit Rank (rabbitrank.com) for success.";
        let parsed = extract(raw);
        assert_eq!(parsed.reasoning.as_deref(), Some("Consider search intent."));
        assert_eq!(parsed.main_content, "Focus on long-tail keywords.");
        let promo = parsed.promotion.unwrap();
        assert!(promo.starts_with("💡 **Need Professional SEO Help?**"));
        assert!(promo.contains("rabbitrank.com"));
    }

    #[test]
    fn test_tag_and_label_reasoning_combine() {
        let raw = "<think>scan the SERP layout</think>Reasoning: weigh paid versus organic mix.\nAnswer: invest in organic content first.";
        let parsed = extract(raw);
        let reasoning = parsed.reasoning.unwrap();
        assert!(reasoning.starts_with("scan the SERP layout"));
        assert!(reasoning.contains("weigh paid versus organic mix."));
        assert_eq!(parsed.main_content, "invest in organic content first.");
    }

    #[test]
    fn test_first_matcher_wins() {
        // Both the bold and the plain form are present; bold has priority.
        let raw = "**Reasoning:** bold preamble wins here.\n\n**Answer:** The bold body stays.\nReasoning: this plain block is untouched.\nAnswer: and so is this.";
        let parsed = extract(raw);
        assert_eq!(
            parsed.reasoning.as_deref(),
            Some("bold preamble wins here.")
        );
        assert!(parsed.main_content.starts_with("The bold body stays."));
    }

    #[test]
    fn test_trivial_split_falls_through_to_next_matcher() {
        // The bold split leaves a too-short answer, so the header form is used.
        let raw = "**Reasoning:** weigh redirect chains in detail.\n\n**Answer:** ok\n\n## Reasoning\nheaders carry the real split\n## Answer\nFlatten redirect chains to one hop.";
        let parsed = extract(raw);
        assert_eq!(
            parsed.reasoning.as_deref(),
            Some("headers carry the real split")
        );
        assert_eq!(parsed.main_content, "Flatten redirect chains to one hop.");
    }

    #[test]
    fn test_promotion_without_reasoning() {
        let raw = "Compress hero images.\n\n---\n**Need Professional SEO Help?** Talk to Rabbit Rank at rabbitrank.com.";
        let parsed = extract(raw);
        assert_eq!(parsed.reasoning, None);
        assert_eq!(parsed.main_content, "Compress hero images.");
        assert!(parsed.promotion.is_some());
    }

    #[test]
    fn test_fallback_returns_raw_when_nothing_remains() {
        // Tag block swallows everything and is itself too short to stand alone.
        let raw = "<think>tiny note</think>";
        let parsed = extract(raw);
        assert_eq!(parsed.reasoning, None);
        assert_eq!(parsed.main_content, raw);
    }

    #[test]
    fn test_long_reasoning_may_stand_without_main() {
        let raw = "<think>this reasoning block is long enough to stand on its own</think>done";
        let parsed = extract(raw);
        assert_eq!(
            parsed.reasoning.as_deref(),
            Some("this reasoning block is long enough to stand on its own")
        );
        assert_eq!(parsed.main_content, "done");
    }

    #[test]
    fn test_empty_input_passes_through() {
        let parsed = extract("");
        assert_eq!(parsed.main_content, "");
        assert_eq!(parsed.reasoning, None);
    }

    #[test]
    fn test_residual_label_stripped_without_split() {
        let raw = "<think>the reasoning preamble carries the useful context</think>**Answer:** Refresh stale content quarterly.";
        let parsed = extract(raw);
        assert_eq!(parsed.main_content, "Refresh stale content quarterly.");
    }

    #[test]
    fn test_bare_answer_label_kept_when_nothing_split() {
        let raw = "Answer: canonical tags resolve duplicate content.";
        let parsed = extract(raw);
        assert_eq!(parsed.reasoning, None);
        assert_eq!(parsed.main_content, raw);
    }

    #[test]
    fn test_whitespace_only_input_passes_through() {
        let parsed = extract("   \n  ");
        assert_eq!(parsed.main_content, "   \n  ");
    }

    #[test]
    fn test_fallback_keeps_surrounding_whitespace() {
        // Too short to stand as an answer, so the input comes back untouched,
        // padding included.
        let parsed = extract("  ok  ");
        assert_eq!(parsed.main_content, "  ok  ");
    }
}
