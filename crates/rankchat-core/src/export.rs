//! Print-ready HTML export.
//!
//! Converts an answer's markdown into a complete standalone HTML document
//! with Rabbit Rank branding, sized for print/PDF capture. The renderer is a
//! deliberately small ordered rewrite cascade over a markdown subset, not a
//! general parser: each pass is an independent textual rewrite, and later
//! passes assume earlier ones already converted their syntax. Malformed
//! input degrades to literal text, never an error.

use std::fmt::Write as _;
use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::{Captures, Regex};

const PRODUCT_NAME: &str = "Rabbit Rank";
const PRODUCT_URL: &str = "https://rabbitrank.com";

/// Sentinel wrapping protected regions during paragraph wrapping.
const OPAQUE: char = '\u{1}';

static HEADING_H3: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^###\s+(.+)$").expect("valid regex"));
static HEADING_H2: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^##\s+(.+)$").expect("valid regex"));
static HEADING_H1: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#\s+(.+)$").expect("valid regex"));

static BOLD_ITALIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*\*([^*]+)\*\*\*|___([^_]+)___").expect("valid regex")
});
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*|__([^_]+)__").expect("valid regex"));
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*\n]+)\*|\b_([^_\n]+)_\b").expect("valid regex"));

// Inline code is restricted to one line so fence backticks survive until the
// fenced-block pass runs.
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`\n]+)`").expect("valid regex"));
static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[\w-]*\n?(.*?)```").expect("valid regex"));

static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)").expect("valid regex"));

static HRULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^-{3,}\s*$").expect("valid regex"));

static UNORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^( *)[-*•]\s+(.+)$").expect("valid regex"));
static LIST_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)((?:^<li.*</li>\n?)+)").expect("valid regex"));
static ORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^ *(\d+)\.\s+(.+)$").expect("valid regex"));

static BLOCKQUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^>\s?(.*)$").expect("valid regex"));

static TABLE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\|?[\s|:-]*-[\s|:-]*\|?\s*$").expect("valid regex"));

static BLOCK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<(?:h[1-6]|ul|ol|li|pre|table|blockquote|hr)\b").expect("valid regex")
});

/// Renders a complete branded HTML document for the given markdown.
///
/// The body conversion is pure; only the generation timestamp in the footer
/// varies between calls.
pub fn to_printable_html(markdown: &str) -> String {
    document(&render_body(markdown), Utc::now())
}

/// The ordered rewrite cascade, producing the document body fragment.
pub fn render_body(markdown: &str) -> String {
    let mut text = escape(markdown);
    text = HEADING_H3.replace_all(&text, "<h3>$1</h3>").into_owned();
    text = HEADING_H2.replace_all(&text, "<h2>$1</h2>").into_owned();
    text = HEADING_H1.replace_all(&text, "<h1>$1</h1>").into_owned();
    text = BOLD_ITALIC
        .replace_all(&text, "<strong><em>$1$2</em></strong>")
        .into_owned();
    text = BOLD.replace_all(&text, "<strong>$1$2</strong>").into_owned();
    text = ITALIC.replace_all(&text, "<em>$1$2</em>").into_owned();
    text = INLINE_CODE.replace_all(&text, "<code>$1</code>").into_owned();
    text = FENCED_BLOCK
        .replace_all(&text, "<pre><code>$1</code></pre>")
        .into_owned();
    text = LINK
        .replace_all(&text, r#"<a href="$2">$1</a>"#)
        .into_owned();
    text = HRULE.replace_all(&text, "<hr>").into_owned();
    text = UNORDERED_ITEM
        .replace_all(&text, |caps: &Captures<'_>| {
            let depth = caps[1].len() / 2;
            format!(
                r#"<li style="margin-left:{}px">{}</li>"#,
                depth * 20,
                &caps[2]
            )
        })
        .into_owned();
    text = LIST_RUN
        .replace_all(&text, "<ul>\n$1</ul>\n")
        .into_owned();
    // Ordered items stay as loose list items; print output reads fine
    // without a numbered container.
    text = ORDERED_ITEM
        .replace_all(&text, "<li>$1. $2</li>")
        .into_owned();
    text = BLOCKQUOTE
        .replace_all(&text, "<blockquote>$1</blockquote>")
        .into_owned();
    text = render_tables(&text);
    wrap_paragraphs(&text)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Converts contiguous pipe-delimited runs into table elements.
///
/// A run qualifies only when its second line is a separator row; anything
/// else stays literal text.
fn render_tables(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        if !lines[i].contains('|') {
            out.push(lines[i].to_string());
            i += 1;
            continue;
        }

        let mut end = i;
        while end < lines.len() && lines[end].contains('|') {
            end += 1;
        }

        let run = &lines[i..end];
        if run.len() >= 2 && TABLE_SEPARATOR.is_match(run[1]) {
            out.push(render_table(run[0], &run[2..]));
        } else {
            out.extend(run.iter().map(|l| (*l).to_string()));
        }
        i = end;
    }

    out.join("\n")
}

fn render_table(header: &str, body: &[&str]) -> String {
    let mut html = String::from(r#"<table style="border-collapse:collapse;width:100%">"#);
    html.push_str("<thead><tr>");
    for cell in split_cells(header) {
        let _ = write!(
            html,
            r#"<th style="border:1px solid #ccc;padding:6px;text-align:left">{cell}</th>"#
        );
    }
    html.push_str("</tr></thead><tbody>");
    for row in body {
        html.push_str("<tr>");
        for cell in split_cells(row) {
            let _ = write!(
                html,
                r#"<td style="border:1px solid #ccc;padding:6px">{cell}</td>"#
            );
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}

/// Pipe-delimited fields, dropping the empty artifacts from outer pipes.
fn split_cells(row: &str) -> Vec<String> {
    let trimmed = row.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('|').unwrap_or(trimmed);
    trimmed.split('|').map(|c| c.trim().to_string()).collect()
}

/// Wraps remaining bare blocks in paragraphs.
///
/// Fenced code regions are swapped for sentinels first so blank lines inside
/// them neither split the block nor get paragraph-wrapped.
fn wrap_paragraphs(text: &str) -> String {
    static PRE_BLOCK: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)<pre>.*?</pre>").expect("valid regex"));

    let mut protected: Vec<String> = Vec::new();
    let masked = PRE_BLOCK
        .replace_all(text, |caps: &Captures<'_>| {
            protected.push(caps[0].to_string());
            format!("{OPAQUE}{}{OPAQUE}", protected.len() - 1)
        })
        .into_owned();

    let mut out = String::with_capacity(masked.len());
    for block in masked.split("\n\n") {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        if BLOCK_TAG.is_match(block) || block.starts_with(OPAQUE) {
            out.push_str(block);
        } else {
            let _ = write!(out, "<p>{}</p>", block.replace('\n', "<br>"));
        }
    }

    for (idx, original) in protected.iter().enumerate() {
        out = out.replace(&format!("{OPAQUE}{idx}{OPAQUE}"), original);
    }
    out
}

/// Assembles the full standalone document around a rendered body.
pub fn document(body: &str, generated_at: DateTime<Utc>) -> String {
    let timestamp = generated_at.to_rfc3339_opts(SecondsFormat::Secs, true);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{PRODUCT_NAME} - SEO Report</title>
<style>
body {{ font-family: Georgia, serif; max-width: 720px; margin: 40px auto; color: #1a1a2e; line-height: 1.6; }}
h1, h2, h3 {{ color: #16213e; }}
pre {{ background: #f4f4f8; padding: 12px; border-radius: 6px; overflow-x: auto; }}
code {{ background: #f4f4f8; padding: 1px 4px; border-radius: 3px; font-size: 0.92em; }}
blockquote {{ border-left: 3px solid #e94560; margin-left: 0; padding-left: 14px; color: #444; }}
.report-header {{ border-bottom: 2px solid #e94560; padding-bottom: 10px; margin-bottom: 24px; }}
.report-footer {{ border-top: 1px solid #ccc; margin-top: 32px; padding-top: 10px; font-size: 0.85em; color: #666; }}
@media print {{ body {{ margin: 0; }} }}
</style>
</head>
<body>
<div class="report-header"><strong>{PRODUCT_NAME}</strong> · SEO Assistant Report</div>
{body}
<div class="report-footer">Generated {timestamp} by <a href="{PRODUCT_URL}">{PRODUCT_NAME}</a></div>
</body>
</html>
"#
    )
}
