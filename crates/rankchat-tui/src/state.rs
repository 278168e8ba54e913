//! Application state for the chat TUI.
//!
//! State is mutated only by the reducer in `update`. The runtime reads it for
//! rendering and effect execution.

use std::collections::{HashMap, HashSet};

use rankchat_core::config::Config;
use rankchat_core::message::{ChatMessage, MessageMeta, Role, Source};
use rankchat_core::parse::{self, ParsedSections};
use rankchat_core::session::SessionLog;

use crate::reveal::RevealController;

/// One rendered entry in the transcript.
#[derive(Debug)]
pub enum TranscriptCell {
    User {
        text: String,
    },
    Assistant {
        /// Message id, keys reveal progress and speech state.
        id: String,
        sections: ParsedSections,
        sources: Vec<Source>,
        meta: MessageMeta,
    },
    /// Local notices: errors, command feedback, startup info.
    System {
        text: String,
    },
}

impl TranscriptCell {
    /// Builds a transcript cell from a stored message, re-running section
    /// extraction on the raw text.
    pub fn from_message(message: &ChatMessage) -> Self {
        match message.role {
            Role::User => TranscriptCell::User {
                text: message.text.clone(),
            },
            Role::Assistant => TranscriptCell::Assistant {
                id: message.id.clone(),
                sections: parse::extract(&message.text),
                sources: message.sources.clone(),
                meta: message.meta.clone(),
            },
        }
    }
}

/// Whether a generation request is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    Idle,
    Waiting,
}

impl ChatPhase {
    pub fn is_waiting(self) -> bool {
        matches!(self, ChatPhase::Waiting)
    }
}

/// Speech playback state for one message, mirrored in the reducer so key
/// handling stays pure. The runtime owns the actual audio device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechPhase {
    Synthesizing,
    Ready,
    Playing,
}

/// Prompt input line with edit history.
#[derive(Debug, Default)]
pub struct InputState {
    pub buffer: String,
    /// Cursor position as a byte offset into `buffer`, always on a char boundary.
    pub cursor: usize,
    pub history: Vec<String>,
    /// Index into `history` while browsing with Up/Down, newest-last.
    pub history_index: Option<usize>,
    /// In-progress text stashed while browsing history.
    pub draft: String,
}

impl InputState {
    pub fn insert(&mut self, ch: char) {
        self.buffer.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    pub fn backspace(&mut self) {
        if let Some((idx, _)) = self.buffer[..self.cursor].char_indices().next_back() {
            self.buffer.remove(idx);
            self.cursor = idx;
        }
    }

    pub fn move_left(&mut self) {
        if let Some((idx, _)) = self.buffer[..self.cursor].char_indices().next_back() {
            self.cursor = idx;
        }
    }

    pub fn move_right(&mut self) {
        if let Some(ch) = self.buffer[self.cursor..].chars().next() {
            self.cursor += ch.len_utf8();
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.buffer.len();
    }

    /// Takes the current buffer, pushing it onto history.
    pub fn take(&mut self) -> String {
        let text = std::mem::take(&mut self.buffer);
        self.cursor = 0;
        self.history_index = None;
        if !text.trim().is_empty() && self.history.last() != Some(&text) {
            self.history.push(text.clone());
        }
        text
    }

    pub fn history_prev(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let next = match self.history_index {
            None => {
                self.draft = std::mem::take(&mut self.buffer);
                self.history.len() - 1
            }
            Some(0) => 0,
            Some(i) => i - 1,
        };
        self.history_index = Some(next);
        self.buffer = self.history[next].clone();
        self.cursor = self.buffer.len();
    }

    pub fn history_next(&mut self) {
        let Some(i) = self.history_index else {
            return;
        };
        if i + 1 < self.history.len() {
            self.history_index = Some(i + 1);
            self.buffer = self.history[i + 1].clone();
        } else {
            self.history_index = None;
            self.buffer = std::mem::take(&mut self.draft);
        }
        self.cursor = self.buffer.len();
    }
}

/// Transcript scroll position.
///
/// `offset` counts lines up from the bottom; zero means following new output.
#[derive(Debug, Default)]
pub struct ScrollState {
    pub offset: usize,
}

impl ScrollState {
    pub fn is_following(&self) -> bool {
        self.offset == 0
    }

    pub fn scroll_up(&mut self, lines: usize, max_offset: usize) {
        self.offset = (self.offset + lines).min(max_offset);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.offset = self.offset.saturating_sub(lines);
    }

    pub fn follow(&mut self) {
        self.offset = 0;
    }
}

/// Full TUI state.
pub struct AppState {
    pub should_quit: bool,
    pub config: Config,
    pub input: InputState,
    pub transcript: Vec<TranscriptCell>,
    pub scroll: ScrollState,
    pub phase: ChatPhase,
    /// Conversation history sent to the provider.
    pub messages: Vec<ChatMessage>,
    /// Session log handle, absent for ephemeral sessions.
    pub session: Option<SessionLog>,
    pub reveal: RevealController,
    pub speech: HashMap<String, SpeechPhase>,
    /// Ids of pinned messages, persisted across sessions.
    pub pins: HashSet<String>,
    /// Show reasoning sections in the transcript.
    pub show_reasoning: bool,
    /// Show promotional footers in the transcript.
    pub show_promotion: bool,
    pub spinner_frame: usize,
    /// Transient one-line notice shown in the status line.
    pub notice: Option<String>,
    /// Terminal size from the latest Frame event.
    pub width: u16,
    pub height: u16,
}

impl AppState {
    pub fn new(config: Config, session: Option<SessionLog>) -> Self {
        Self::with_history(config, session, Vec::new())
    }

    /// Creates state with a pre-loaded conversation (resumed session).
    pub fn with_history(
        config: Config,
        session: Option<SessionLog>,
        history: Vec<ChatMessage>,
    ) -> Self {
        let transcript = history.iter().map(TranscriptCell::from_message).collect();
        let command_history = history
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.text.clone())
            .collect();

        let input = InputState {
            history: command_history,
            ..InputState::default()
        };

        Self {
            should_quit: false,
            config,
            input,
            transcript,
            scroll: ScrollState::default(),
            phase: ChatPhase::Idle,
            messages: history,
            session,
            reveal: RevealController::new(),
            speech: HashMap::new(),
            pins: HashSet::new(),
            show_reasoning: false,
            show_promotion: true,
            spinner_frame: 0,
            notice: None,
            width: 80,
            height: 24,
        }
    }

    /// Pushes a local notice cell to the transcript.
    pub fn push_system(&mut self, text: impl Into<String>) {
        self.transcript.push(TranscriptCell::System { text: text.into() });
        self.scroll.follow();
    }

    /// Returns the id and main content of the most recent assistant message.
    pub fn last_assistant(&self) -> Option<(&str, &str)> {
        self.transcript.iter().rev().find_map(|cell| match cell {
            TranscriptCell::Assistant { id, sections, .. } => {
                Some((id.as_str(), sections.main_content.as_str()))
            }
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_editing_respects_char_boundaries() {
        let mut input = InputState::default();
        for ch in "seo日本".chars() {
            input.insert(ch);
        }
        assert_eq!(input.buffer, "seo日本");

        input.backspace();
        assert_eq!(input.buffer, "seo日");
        input.move_left();
        input.insert('語');
        assert_eq!(input.buffer, "seo語日");
    }

    #[test]
    fn take_records_history_once() {
        let mut input = InputState::default();
        input.buffer = "best keywords".to_string();
        input.cursor = input.buffer.len();
        assert_eq!(input.take(), "best keywords");
        assert_eq!(input.history, vec!["best keywords".to_string()]);
        assert!(input.buffer.is_empty());

        // Blank submissions do not enter history.
        input.buffer = "   ".to_string();
        input.take();
        assert_eq!(input.history.len(), 1);
    }

    #[test]
    fn history_browsing_restores_draft() {
        let mut input = InputState::default();
        input.history = vec!["first".to_string(), "second".to_string()];
        input.buffer = "dra".to_string();
        input.cursor = 3;

        input.history_prev();
        assert_eq!(input.buffer, "second");
        input.history_prev();
        assert_eq!(input.buffer, "first");
        input.history_prev();
        assert_eq!(input.buffer, "first");

        input.history_next();
        assert_eq!(input.buffer, "second");
        input.history_next();
        assert_eq!(input.buffer, "dra");
        assert!(input.history_index.is_none());
    }

    #[test]
    fn scroll_clamps_at_limits() {
        let mut scroll = ScrollState::default();
        assert!(scroll.is_following());

        scroll.scroll_up(10, 6);
        assert_eq!(scroll.offset, 6);
        scroll.scroll_down(2);
        assert_eq!(scroll.offset, 4);
        scroll.scroll_down(100);
        assert!(scroll.is_following());
    }
}
