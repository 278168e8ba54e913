//! Markdown rendering for transcript cells.
//!
//! Parses assistant text with pulldown-cmark and produces styled, pre-wrapped
//! ratatui lines. Rendering never fails: anything the parser does not
//! recognize falls through as plain text.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

/// Renders markdown into wrapped lines no wider than `width`.
pub fn render_markdown(text: &str, width: usize) -> Vec<Line<'static>> {
    let mut renderer = Renderer::new(width.max(1));
    for event in Parser::new(text) {
        renderer.process(event);
    }
    renderer.finish()
}

struct Renderer {
    width: usize,
    lines: Vec<Line<'static>>,
    /// Unwrapped spans for the block currently being collected.
    current: Vec<Span<'static>>,
    style_stack: Vec<Style>,
    /// Ordered-list counters; `None` entries are unordered lists.
    list_stack: Vec<Option<u64>>,
    in_code_block: bool,
    in_blockquote: bool,
    /// Prefix applied to the first wrapped line of the current block.
    first_prefix: String,
    /// Prefix applied to continuation lines of the current block.
    rest_prefix: String,
}

impl Renderer {
    fn new(width: usize) -> Self {
        Self {
            width,
            lines: Vec::new(),
            current: Vec::new(),
            style_stack: vec![Style::default()],
            list_stack: Vec::new(),
            in_code_block: false,
            in_blockquote: false,
            first_prefix: String::new(),
            rest_prefix: String::new(),
        }
    }

    fn style(&self) -> Style {
        self.style_stack.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, style: Style) {
        self.style_stack.push(style);
    }

    fn pop_style(&mut self) {
        if self.style_stack.len() > 1 {
            self.style_stack.pop();
        }
    }

    fn process(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start_tag(&tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => {
                if self.in_code_block {
                    self.push_code_lines(&text);
                } else {
                    self.current.push(Span::styled(text.into_string(), self.style()));
                }
            }
            Event::Code(code) => {
                self.current.push(Span::styled(
                    code.into_string(),
                    Style::default().fg(Color::Yellow),
                ));
            }
            Event::SoftBreak => {
                self.current.push(Span::styled(" ".to_string(), self.style()));
            }
            Event::HardBreak => self.flush_block_no_gap(),
            Event::Rule => {
                self.flush_block();
                self.lines.push(Line::from(Span::styled(
                    "─".repeat(self.width.min(40)),
                    Style::default().fg(Color::DarkGray),
                )));
                self.lines.push(Line::default());
            }
            // Raw HTML and footnotes are dropped rather than echoed into the
            // terminal.
            Event::Html(_) | Event::InlineHtml(_) | Event::FootnoteReference(_) => {}
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.current.push(Span::styled(
                    marker.to_string(),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            Event::InlineMath(text) | Event::DisplayMath(text) => {
                self.current.push(Span::styled(text.into_string(), self.style()));
            }
        }
    }

    fn start_tag(&mut self, tag: &Tag) {
        match tag {
            Tag::Paragraph => {}
            Tag::Heading { level, .. } => {
                let style = match level {
                    HeadingLevel::H1 | HeadingLevel::H2 => Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                    _ => Style::default().add_modifier(Modifier::BOLD),
                };
                self.push_style(style);
            }
            Tag::CodeBlock(kind) => {
                self.flush_block();
                self.in_code_block = true;
                if let CodeBlockKind::Fenced(lang) = kind
                    && !lang.is_empty()
                {
                    self.lines.push(Line::from(Span::styled(
                        lang.to_string(),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
            }
            Tag::List(start) => {
                self.flush_block();
                self.list_stack.push(*start);
            }
            Tag::Item => {
                self.flush_block_no_gap();
                let depth = self.list_stack.len().saturating_sub(1);
                let indent = "  ".repeat(depth);
                match self.list_stack.last_mut() {
                    Some(Some(n)) => {
                        self.first_prefix = format!("{indent}{n}. ");
                        *n += 1;
                    }
                    _ => self.first_prefix = format!("{indent}- "),
                }
                self.rest_prefix = " ".repeat(self.first_prefix.width());
            }
            Tag::BlockQuote(_) => {
                self.flush_block();
                self.in_blockquote = true;
                self.push_style(Style::default().fg(Color::DarkGray));
            }
            Tag::Emphasis => self.push_style(self.style().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(self.style().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.push_style(self.style().add_modifier(Modifier::CROSSED_OUT));
            }
            Tag::Link { .. } => {
                self.push_style(
                    Style::default()
                        .fg(Color::Blue)
                        .add_modifier(Modifier::UNDERLINED),
                );
            }
            _ => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.flush_block(),
            TagEnd::Heading(_) => {
                self.flush_block();
                self.pop_style();
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.lines.push(Line::default());
            }
            TagEnd::List(_) => {
                self.flush_block_no_gap();
                self.list_stack.pop();
                if self.list_stack.is_empty() {
                    self.lines.push(Line::default());
                }
            }
            TagEnd::Item => self.flush_block_no_gap(),
            TagEnd::BlockQuote(_) => {
                self.flush_block();
                self.in_blockquote = false;
                self.pop_style();
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => {
                self.pop_style();
            }
            _ => {}
        }
    }

    /// Emits one verbatim line per code-block line, highlighted, unwrapped.
    fn push_code_lines(&mut self, text: &str) {
        for raw in text.lines() {
            self.lines.push(Line::from(Span::styled(
                format!("  {raw}"),
                Style::default().fg(Color::Yellow),
            )));
        }
    }

    fn flush_block(&mut self) {
        self.flush_block_no_gap();
        if !self.lines.is_empty() && self.list_stack.is_empty() {
            self.lines.push(Line::default());
        }
    }

    /// Wraps and emits the current block without a trailing blank line.
    fn flush_block_no_gap(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let spans = std::mem::take(&mut self.current);
        let quote_prefix = if self.in_blockquote { "▏ " } else { "" };
        let first = format!("{quote_prefix}{}", self.first_prefix);
        let rest = format!("{quote_prefix}{}", self.rest_prefix);
        let wrapped = wrap_spans(&spans, self.width, &first, &rest);
        self.lines.extend(wrapped);
        self.first_prefix.clear();
        self.rest_prefix.clear();
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush_block_no_gap();
        // Trim trailing blank lines left by block gaps.
        while self
            .lines
            .last()
            .is_some_and(|line| line.width() == 0)
        {
            self.lines.pop();
        }
        self.lines
    }
}

/// Greedy word wrap over styled spans, preserving the style of each word.
fn wrap_spans(
    spans: &[Span<'static>],
    width: usize,
    first_prefix: &str,
    rest_prefix: &str,
) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = prefix_spans(first_prefix);
    let mut current_width = first_prefix.width();

    let mut flush =
        |current: &mut Vec<Span<'static>>, current_width: &mut usize, lines: &mut Vec<Line<'static>>| {
            lines.push(Line::from(std::mem::take(current)));
            *current = prefix_spans(rest_prefix);
            *current_width = rest_prefix.width();
        };

    for span in spans {
        for (i, word) in span.content.split_whitespace().enumerate() {
            let word_width = word.width();
            let at_line_start = current_width == first_prefix.width() && lines.is_empty()
                || current_width == rest_prefix.width() && !lines.is_empty();
            let sep = if at_line_start || (i == 0 && current.len() <= 1) {
                0
            } else {
                1
            };

            if current_width + sep + word_width > width && !at_line_start {
                flush(&mut current, &mut current_width, &mut lines);
            } else if sep == 1 {
                current.push(Span::styled(" ".to_string(), span.style));
                current_width += 1;
            }
            current.push(Span::styled(word.to_string(), span.style));
            current_width += word_width;
        }
    }

    if current.iter().any(|s| !s.content.trim().is_empty()) || lines.is_empty() {
        lines.push(Line::from(current));
    }
    lines
}

fn prefix_spans(prefix: &str) -> Vec<Span<'static>> {
    if prefix.is_empty() {
        Vec::new()
    } else {
        vec![Span::styled(
            prefix.to_string(),
            Style::default().fg(Color::DarkGray),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered_text(lines: &[Line<'static>]) -> Vec<String> {
        lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|s| s.content.as_ref())
                    .collect::<String>()
            })
            .collect()
    }

    #[test]
    fn plain_paragraph_renders_as_text() {
        let lines = render_markdown("Improve your page speed.", 80);
        assert_eq!(rendered_text(&lines), vec!["Improve your page speed."]);
    }

    #[test]
    fn long_paragraph_wraps_at_width() {
        let lines = render_markdown(
            "Search engines reward pages that load quickly and answer the query directly.",
            30,
        );
        for line in &lines {
            assert!(line.width() <= 30, "line too wide: {}", line.width());
        }
        assert!(lines.len() > 1);
    }

    #[test]
    fn heading_is_bold() {
        let lines = render_markdown("## Keyword Research", 80);
        assert_eq!(rendered_text(&lines)[0], "Keyword Research");
        assert!(
            lines[0]
                .spans
                .iter()
                .all(|s| s.style.add_modifier.contains(Modifier::BOLD))
        );
    }

    #[test]
    fn bullet_list_gets_markers() {
        let lines = render_markdown("- first tip\n- second tip", 80);
        let text = rendered_text(&lines);
        assert!(text[0].starts_with("- first tip"));
        assert!(text[1].starts_with("- second tip"));
    }

    #[test]
    fn ordered_list_counts_up() {
        let lines = render_markdown("1. audit\n2. fix\n3. measure", 80);
        let text = rendered_text(&lines);
        assert!(text[0].starts_with("1. audit"));
        assert!(text[1].starts_with("2. fix"));
        assert!(text[2].starts_with("3. measure"));
    }

    #[test]
    fn code_block_lines_are_verbatim() {
        let lines = render_markdown("```robots\nUser-agent: *\nDisallow: /tmp\n```", 80);
        let text = rendered_text(&lines);
        assert!(text.contains(&"  User-agent: *".to_string()));
        assert!(text.contains(&"  Disallow: /tmp".to_string()));
    }

    #[test]
    fn inline_code_is_highlighted() {
        let lines = render_markdown("Add a `robots.txt` file.", 80);
        let code_span = lines[0]
            .spans
            .iter()
            .find(|s| s.content.as_ref() == "robots.txt")
            .expect("code span");
        assert_eq!(code_span.style.fg, Some(Color::Yellow));
    }

    #[test]
    fn empty_input_renders_nothing() {
        assert!(render_markdown("", 80).is_empty());
    }

    #[test]
    fn malformed_markdown_never_panics() {
        for input in ["***", "```", "[link](", "> > >", "#"] {
            let _ = render_markdown(input, 20);
        }
    }
}
