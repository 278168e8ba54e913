//! Reasoning block matchers.
//!
//! Models sometimes prefix their answer with a reasoning preamble using one
//! of several conventions (inline `<think>` tags, bracket blocks, bold or
//! plain labels, dash rules, markdown headings). Each convention gets one
//! pure matcher; `extract` evaluates them in priority order and takes the
//! first non-trivial hit. The outcome is a tagged variant so the rejection
//! policy (a "match" that leaves nothing worth showing) stays explicit and
//! testable per matcher.

use std::sync::LazyLock;

use regex::Regex;

/// Minimum length for each side of a split before it counts as a real match.
///
/// A split where either the reasoning or the remaining answer is this short
/// is treated as a false positive (e.g. prose that merely mentions the word
/// "Reasoning") and the cascade moves on.
pub const MIN_SPLIT_SIDE_LEN: usize = 11;

/// Result of applying one matcher to a response text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The pattern is not present.
    NoMatch,
    /// The pattern matched but one side was too short; rejected.
    Trivial,
    /// Accepted split.
    Accepted(SplitMatch),
}

/// An accepted reasoning/answer split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitMatch {
    pub reasoning: String,
    pub main: String,
}

/// A named split matcher, for diagnostics and per-matcher tests.
pub struct Matcher {
    pub name: &'static str,
    pub apply: fn(&str) -> MatchOutcome,
}

/// Split matchers in priority order (most to least distinctive).
///
/// Tag and bracket extraction run before these and are removal-based, not
/// split-based; see `strip_tagged_reasoning` / `strip_bracket_reasoning`.
pub const SPLIT_MATCHERS: &[Matcher] = &[
    Matcher {
        name: "bold_label",
        apply: match_bold_label,
    },
    Matcher {
        name: "plain_label",
        apply: match_plain_label,
    },
    Matcher {
        name: "thinking_label",
        apply: match_thinking_label,
    },
    Matcher {
        name: "dash_delimited",
        apply: match_dash_delimited,
    },
    Matcher {
        name: "markdown_header",
        apply: match_markdown_header,
    },
];

static THINKING_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<think(?:ing)?>(.*?)</think(?:ing)?>").expect("valid regex")
});

static BRACKET_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\[Reasoning\](.*?)\[/Reasoning\]").expect("valid regex")
});

static BOLD_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\*\*\s*Reasoning:?\s*\*\*:?\s*(.*?)\*\*\s*(?:Final\s+Answer|Answer|Response):?\s*\*\*:?\s*(.*)")
        .expect("valid regex")
});

static PLAIN_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ims)^Reasoning:\s*(.*?)^(?:Final\s+Answer|Answer|Response):\s*(.*)")
        .expect("valid regex")
});

static THINKING_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ims)^Thinking:\s*(.*?)^(?:Final\s+Answer|Answer|Response):\s*(.*)")
        .expect("valid regex")
});

static DASH_DELIMITED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ims)^-{3,}\s*Reasoning\s*-{3,}\s*$(.*?)^-{3,}\s*(?:Final\s+Answer|Answer|Response)\s*-{3,}\s*$(.*)")
        .expect("valid regex")
});

static MARKDOWN_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ims)^#{2,3}\s*Reasoning\s*$(.*?)^#{2,3}\s*(?:Final\s+Answer|Answer|Response)\s*$(.*)")
        .expect("valid regex")
});

/// Residual answer-label tokens left at the head of a split main content.
static RESIDUAL_ANSWER_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:\*\*\s*(?:Final\s+Answer|Answer|Response):?\s*\*\*:?|#{1,4}\s*(?:Final\s+Answer|Answer|Response)\s*|(?:Final\s+Answer|Answer|Response):)\s*",
    )
    .expect("valid regex")
});

/// Removes all inline `<think>`/`<thinking>` blocks from `text`.
///
/// Returns the reduced text and the collected reasoning (blank-line joined),
/// or `None` when no tag pair is present. Runs unconditionally before the
/// split cascade and does not require a following answer marker.
pub fn strip_tagged_reasoning(text: &str) -> Option<(String, String)> {
    strip_all(&THINKING_TAG, text)
}

/// Removes all `[Reasoning]…[/Reasoning]` blocks from `text`.
pub fn strip_bracket_reasoning(text: &str) -> Option<(String, String)> {
    strip_all(&BRACKET_BLOCK, text)
}

fn strip_all(re: &Regex, text: &str) -> Option<(String, String)> {
    if !re.is_match(text) {
        return None;
    }

    let mut blocks = Vec::new();
    for caps in re.captures_iter(text) {
        let inner = caps.get(1).map_or("", |m| m.as_str()).trim();
        if !inner.is_empty() {
            blocks.push(inner.to_string());
        }
    }

    let reduced = re.replace_all(text, "").trim().to_string();
    Some((reduced, blocks.join("\n\n")))
}

fn split_outcome(reasoning: &str, main: &str) -> MatchOutcome {
    let reasoning = reasoning.trim();
    let main = strip_residual_answer_label(main.trim());
    if reasoning.len() < MIN_SPLIT_SIDE_LEN || main.len() < MIN_SPLIT_SIDE_LEN {
        return MatchOutcome::Trivial;
    }
    MatchOutcome::Accepted(SplitMatch {
        reasoning: reasoning.to_string(),
        main,
    })
}

fn match_with(re: &Regex, text: &str) -> MatchOutcome {
    match re.captures(text) {
        None => MatchOutcome::NoMatch,
        Some(caps) => split_outcome(
            caps.get(1).map_or("", |m| m.as_str()),
            caps.get(2).map_or("", |m| m.as_str()),
        ),
    }
}

fn match_bold_label(text: &str) -> MatchOutcome {
    match_with(&BOLD_LABEL, text)
}

fn match_plain_label(text: &str) -> MatchOutcome {
    match_with(&PLAIN_LABEL, text)
}

fn match_thinking_label(text: &str) -> MatchOutcome {
    match_with(&THINKING_LABEL, text)
}

fn match_dash_delimited(text: &str) -> MatchOutcome {
    match_with(&DASH_DELIMITED, text)
}

fn match_markdown_header(text: &str) -> MatchOutcome {
    match_with(&MARKDOWN_HEADER, text)
}

/// Strips one leftover answer-label token from the head of a split result.
pub fn strip_residual_answer_label(main: &str) -> String {
    RESIDUAL_ANSWER_LABEL.replace(main, "").trim().to_string()
}
