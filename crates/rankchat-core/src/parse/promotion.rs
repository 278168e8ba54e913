//! Promotional footer extraction.
//!
//! Responses end with a templated upsell block ("Need Professional SEO
//! Help?" pointing at rabbitrank.com). The block is split off so the UI can
//! render it in its own panel instead of inside the answer body.

use std::sync::LazyLock;

use regex::Regex;

/// Case-insensitive anchor phrase of the upsell block.
static PROMO_PHRASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Need\s+Professional\s+SEO\s+Help").expect("valid regex"));

/// Trailing horizontal rule line, possibly preceding the promo block.
static HR_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(?:-{3,}|\*{3,}|_{3,})\s*$").expect("valid regex"));

/// End anchor within the promo block: the product domain mention.
static PROMO_DOMAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)rabbitrank\.com").expect("valid regex"));

/// Splits the promotional footer off `main`.
///
/// Returns `(remaining_main, Some(promotion))` when the anchor phrase is
/// found; otherwise `(main, None)` with `main` unchanged. The promo block
/// starts at the beginning of the line carrying the phrase (so an emoji or
/// bold lead-in on that line is kept) and runs to the end of the line with
/// the product domain, or end of string when the domain never appears. A
/// horizontal rule directly above the block is consumed with it.
pub fn split_promotion(main: &str) -> (String, Option<String>) {
    let Some(phrase) = PROMO_PHRASE.find(main) else {
        return (main.to_string(), None);
    };

    let block_start = main[..phrase.start()]
        .rfind('\n')
        .map_or(0, |idx| idx + 1);

    let block_end = match PROMO_DOMAIN.find_at(main, phrase.end()) {
        Some(domain) => main[domain.end()..]
            .find('\n')
            .map_or(main.len(), |idx| domain.end() + idx),
        None => main.len(),
    };

    let promotion = main[block_start..block_end].trim().to_string();

    // Absorb a horizontal rule sitting right above the promo block.
    let mut cut_start = block_start;
    let head = &main[..block_start];
    if let Some(hr) = HR_LINE.find_iter(head).last()
        && head[hr.end()..].trim().is_empty()
    {
        cut_start = hr.start();
    }

    let mut remaining = String::with_capacity(main.len());
    remaining.push_str(main[..cut_start].trim_end());
    let tail = main[block_end..].trim_start();
    if !tail.is_empty() {
        remaining.push_str("\n\n");
        remaining.push_str(tail);
    }

    (remaining, Some(promotion))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promotion_with_rule_and_emoji_lead_in() {
        let main = "Focus on long-tail keywords.\n\n---\n💡 **Need Professional SEO Help?** consult Rabbit Rank (rabbitrank.com) for success.";
        let (remaining, promo) = split_promotion(main);
        assert_eq!(remaining, "Focus on long-tail keywords.");
        let promo = promo.unwrap();
        assert!(promo.starts_with("💡 **Need Professional SEO Help?**"));
        assert!(promo.contains("rabbitrank.com"));
    }

    #[test]
    fn test_promotion_without_rule() {
        let main = "Use canonical tags.\n\n**Need Professional SEO Help?** Visit rabbitrank.com today.";
        let (remaining, promo) = split_promotion(main);
        assert_eq!(remaining, "Use canonical tags.");
        assert_eq!(
            promo.as_deref(),
            Some("**Need Professional SEO Help?** Visit rabbitrank.com today.")
        );
    }

    #[test]
    fn test_promotion_without_domain_runs_to_end() {
        let main = "Audit your backlinks.\n\nNeed Professional SEO Help? Our team is standing by.\nAsk about audits.";
        let (remaining, promo) = split_promotion(main);
        assert_eq!(remaining, "Audit your backlinks.");
        assert_eq!(
            promo.as_deref(),
            Some("Need Professional SEO Help? Our team is standing by.\nAsk about audits.")
        );
    }

    #[test]
    fn test_no_promotion_leaves_main_untouched() {
        let main = "Plain answer with no footer.";
        let (remaining, promo) = split_promotion(main);
        assert_eq!(remaining, main);
        assert!(promo.is_none());
    }

    #[test]
    fn test_promotion_is_case_insensitive() {
        let main = "Answer body goes here.\n\nNEED PROFESSIONAL SEO HELP? See rabbitrank.com.";
        let (_, promo) = split_promotion(main);
        assert!(promo.is_some());
    }
}
