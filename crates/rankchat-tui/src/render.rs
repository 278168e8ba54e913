//! Pure view functions for the TUI.
//!
//! Functions here take `&AppState`, draw to a ratatui frame, and never mutate
//! state or return effects.

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use unicode_width::UnicodeWidthStr;

use crate::markdown::render_markdown;
use crate::state::{AppState, ChatPhase, SpeechPhase, TranscriptCell};

/// Height of the status line below the input.
const STATUS_HEIGHT: u16 = 1;

/// Input box height including its border.
const INPUT_HEIGHT: u16 = 3;

/// Horizontal padding on each side of the transcript.
const TRANSCRIPT_MARGIN: u16 = 1;

/// Spinner frames for the status line animation.
const SPINNER_FRAMES: &[&str] = &["◐", "◓", "◑", "◒"];

/// Ticks per spinner frame advance.
const SPINNER_SPEED_DIVISOR: usize = 12;

/// Renders the entire TUI to the frame.
pub fn render(app: &AppState, frame: &mut Frame) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .split(area);

    render_transcript(app, frame, chunks[0]);
    render_input(app, frame, chunks[1]);
    render_status_line(app, frame, chunks[2]);
}

fn render_transcript(app: &AppState, frame: &mut Frame, area: Rect) {
    let width = area.width.saturating_sub(TRANSCRIPT_MARGIN * 2) as usize;
    let height = area.height as usize;

    let all_lines = build_transcript_lines(app, width.max(10));
    let total = all_lines.len();
    let max_offset = total.saturating_sub(height);
    let offset_from_bottom = app.scroll.offset.min(max_offset);
    let start = max_offset - offset_from_bottom;

    let visible: Vec<Line<'static>> = all_lines
        .into_iter()
        .skip(start)
        .take(height)
        .collect();

    // Bottom-align when the transcript does not fill the pane.
    let padded: Vec<Line<'static>> = if visible.len() < height {
        let mut lines = vec![Line::default(); height - visible.len()];
        lines.extend(visible);
        lines
    } else {
        visible
    };

    let inner = Rect {
        x: area.x + TRANSCRIPT_MARGIN,
        y: area.y,
        width: area.width.saturating_sub(TRANSCRIPT_MARGIN * 2),
        height: area.height,
    };
    frame.render_widget(Paragraph::new(padded), inner);
}

/// Builds the full pre-wrapped transcript as styled lines.
pub fn build_transcript_lines(app: &AppState, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for cell in &app.transcript {
        match cell {
            TranscriptCell::User { text } => {
                let mut spans = vec![Span::styled(
                    "❯ ".to_string(),
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                )];
                spans.push(Span::styled(
                    text.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ));
                lines.push(Line::from(spans));
                lines.push(Line::default());
            }
            TranscriptCell::Assistant {
                id,
                sections,
                sources,
                ..
            } => {
                if app.show_reasoning
                    && let Some(reasoning) = &sections.reasoning
                {
                    lines.push(Line::from(Span::styled(
                        "Reasoning".to_string(),
                        Style::default()
                            .fg(Color::DarkGray)
                            .add_modifier(Modifier::ITALIC),
                    )));
                    for line in render_markdown(reasoning, width) {
                        lines.push(dim_line(line));
                    }
                    lines.push(Line::default());
                }

                let visible = app.reveal.visible_prefix(id, &sections.main_content);
                lines.extend(render_markdown(visible, width));

                if app.show_promotion
                    && let Some(promotion) = &sections.promotion
                {
                    lines.push(Line::default());
                    for line in render_markdown(promotion, width) {
                        lines.push(recolor_line(line, Color::Magenta));
                    }
                }

                if !sources.is_empty() {
                    lines.push(Line::default());
                    lines.push(Line::from(Span::styled(
                        "Sources".to_string(),
                        Style::default().fg(Color::DarkGray),
                    )));
                    for (i, source) in sources.iter().enumerate() {
                        lines.push(Line::from(Span::styled(
                            format!("  {}. {} - {}", i + 1, source.title, source.uri),
                            Style::default().fg(Color::DarkGray),
                        )));
                    }
                }

                if app.pins.contains(id) {
                    lines.push(Line::from(Span::styled(
                        "📌 pinned".to_string(),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
                if let Some(phase) = app.speech.get(id) {
                    let label = match phase {
                        SpeechPhase::Synthesizing => "♪ synthesizing...",
                        SpeechPhase::Ready => "♪ paused",
                        SpeechPhase::Playing => "♪ playing",
                    };
                    lines.push(Line::from(Span::styled(
                        label.to_string(),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
                lines.push(Line::default());
            }
            TranscriptCell::System { text } => {
                for line in text.lines() {
                    lines.push(Line::from(Span::styled(
                        line.to_string(),
                        Style::default()
                            .fg(Color::DarkGray)
                            .add_modifier(Modifier::ITALIC),
                    )));
                }
                lines.push(Line::default());
            }
        }
    }

    lines
}

fn dim_line(line: Line<'static>) -> Line<'static> {
    recolor_line(line, Color::DarkGray)
}

fn recolor_line(line: Line<'static>, color: Color) -> Line<'static> {
    let spans: Vec<Span<'static>> = line
        .spans
        .into_iter()
        .map(|span| Span::styled(span.content, span.style.fg(color)))
        .collect();
    Line::from(spans)
}

fn render_input(app: &AppState, frame: &mut Frame, area: Rect) {
    let title = format!(" {} ({}) ", app.config.model, app.config.response_mode.display_name());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(title, Style::default().fg(Color::DarkGray)));

    let inner_width = area.width.saturating_sub(2) as usize;
    let before_cursor = &app.input.buffer[..app.input.cursor];
    // Horizontal scroll keeps the cursor visible on long input.
    let cursor_col = before_cursor.width();
    let skip = cursor_col.saturating_sub(inner_width.saturating_sub(1));

    let visible: String = app
        .input
        .buffer
        .chars()
        .skip(skip)
        .take(inner_width)
        .collect();
    let input = Paragraph::new(visible).block(block);
    frame.render_widget(input, area);

    frame.set_cursor_position(Position {
        x: area.x + 1 + (cursor_col - skip) as u16,
        y: area.y + 1,
    });
}

fn render_status_line(app: &AppState, frame: &mut Frame, area: Rect) {
    let spans: Vec<Span> = if let Some(notice) = &app.notice {
        vec![Span::styled(
            notice.clone(),
            Style::default().fg(Color::Yellow),
        )]
    } else if app.phase == ChatPhase::Waiting {
        let spinner =
            SPINNER_FRAMES[(app.spinner_frame / SPINNER_SPEED_DIVISOR) % SPINNER_FRAMES.len()];
        vec![
            Span::styled(spinner.to_string(), Style::default().fg(Color::Yellow)),
            Span::raw(" "),
            Span::styled("Thinking...", Style::default().fg(Color::Yellow)),
        ]
    } else if app.reveal.is_animating() {
        vec![
            Span::styled("Esc", Style::default().fg(Color::DarkGray)),
            Span::raw(" skip animation"),
        ]
    } else {
        vec![
            Span::styled("Enter", Style::default().fg(Color::DarkGray)),
            Span::raw(" send  "),
            Span::styled("Ctrl+S", Style::default().fg(Color::DarkGray)),
            Span::raw(" speak  "),
            Span::styled("Ctrl+E", Style::default().fg(Color::DarkGray)),
            Span::raw(" export  "),
            Span::styled("Ctrl+R", Style::default().fg(Color::DarkGray)),
            Span::raw(" reasoning  "),
            Span::styled("Ctrl+C", Style::default().fg(Color::DarkGray)),
            Span::raw(" quit"),
        ]
    };

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rankchat_core::config::Config;
    use rankchat_core::message::{ChatMessage, MessageMeta, Source};

    fn app_with_reply(text: &str) -> AppState {
        let mut app = AppState::new(Config::default(), None);
        let message = ChatMessage::assistant(text, Vec::new(), MessageMeta::default());
        app.transcript.push(TranscriptCell::from_message(&message));
        app
    }

    fn all_text(lines: &[Line<'static>]) -> String {
        lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|s| s.content.as_ref())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn user_cells_get_a_prompt_marker() {
        let mut app = AppState::new(Config::default(), None);
        app.transcript.push(TranscriptCell::User {
            text: "rank my bakery".to_string(),
        });
        let text = all_text(&build_transcript_lines(&app, 80));
        assert!(text.contains("❯ rank my bakery"));
    }

    #[test]
    fn reasoning_is_hidden_by_default() {
        let app = app_with_reply(
            "**Reasoning:** Think about local search intent.\n\n**Answer:** Claim your listing.",
        );
        let text = all_text(&build_transcript_lines(&app, 80));
        assert!(!text.contains("local search intent"));
        assert!(text.contains("Claim your listing."));
    }

    #[test]
    fn reasoning_shows_when_toggled() {
        let mut app = app_with_reply(
            "**Reasoning:** Think about local search intent.\n\n**Answer:** Claim your listing.",
        );
        app.show_reasoning = true;
        let text = all_text(&build_transcript_lines(&app, 80));
        assert!(text.contains("local search intent"));
    }

    #[test]
    fn promotion_renders_after_the_answer() {
        let app = app_with_reply(
            "Optimize your titles.\n\n---\n\n💡 **Need Professional SEO Help?** Visit rabbitrank.com today.",
        );
        let text = all_text(&build_transcript_lines(&app, 80));
        let answer_pos = text.find("Optimize your titles.").expect("answer");
        let promo_pos = text.find("Need Professional SEO Help").expect("promo");
        assert!(promo_pos > answer_pos);
    }

    #[test]
    fn promotion_hides_when_toggled_off() {
        let mut app = app_with_reply(
            "Optimize your titles.\n\n---\n\n💡 **Need Professional SEO Help?** Visit rabbitrank.com today.",
        );
        app.show_promotion = false;
        let text = all_text(&build_transcript_lines(&app, 80));
        assert!(text.contains("Optimize your titles."));
        assert!(!text.contains("Need Professional SEO Help"));
    }

    #[test]
    fn pinned_reply_shows_marker() {
        let mut app = app_with_reply("Canonicalize duplicate pages.");
        let (id, _) = app.last_assistant().expect("assistant cell");
        let id = id.to_string();
        app.pins.insert(id);
        let text = all_text(&build_transcript_lines(&app, 80));
        assert!(text.contains("pinned"));
    }

    #[test]
    fn sources_are_listed() {
        let mut app = AppState::new(Config::default(), None);
        let message = ChatMessage::assistant(
            "Grounded answer.",
            vec![Source {
                title: "SEO Guide".to_string(),
                uri: "https://example.com/guide".to_string(),
            }],
            MessageMeta::default(),
        );
        app.transcript.push(TranscriptCell::from_message(&message));
        let text = all_text(&build_transcript_lines(&app, 80));
        assert!(text.contains("Sources"));
        assert!(text.contains("1. SEO Guide - https://example.com/guide"));
    }

    #[test]
    fn reveal_truncates_the_answer() {
        let mut app = app_with_reply("A longer answer that reveals gradually over several ticks.");
        if let Some(TranscriptCell::Assistant { id, sections, .. }) = app.transcript.last() {
            let id = id.clone();
            let main = sections.main_content.clone();
            app.reveal.start(&id, &main);
        }
        app.reveal.tick();
        let text = all_text(&build_transcript_lines(&app, 80));
        assert!(text.contains("A l"));
        assert!(!text.contains("several ticks"));
    }
}
