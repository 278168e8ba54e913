//! Pure reducer: `(state, event) -> effects`.
//!
//! All key handling and chat flow decisions live here. The reducer never does
//! I/O; it mutates `AppState` and returns effects for the runtime to execute.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use rankchat_core::message::{ChatMessage, ResponseMode};
use rankchat_core::session::SessionLog;
use rankchat_core::stats::UsageStats;

use crate::effects::UiEffect;
use crate::events::{AssistantReply, UiEvent};
use crate::state::{AppState, ChatPhase, SpeechPhase, TranscriptCell};

/// Lines moved per PageUp/PageDown press.
const SCROLL_PAGE: usize = 10;

pub fn update(app: &mut AppState, event: UiEvent) -> Vec<UiEffect> {
    match event {
        UiEvent::Frame { width, height } => {
            app.width = width;
            app.height = height;
            Vec::new()
        }
        UiEvent::Tick => {
            if app.phase.is_waiting() {
                app.spinner_frame = app.spinner_frame.wrapping_add(1);
            }
            app.reveal.tick();
            Vec::new()
        }
        UiEvent::Terminal(term_event) => handle_terminal_event(app, term_event),
        UiEvent::ReplyReceived(result) => handle_reply(app, *result),
        UiEvent::SpeechSynthesized { message_id, result } => {
            handle_speech_synthesized(app, &message_id, result.map(|_| ()))
        }
        UiEvent::SpeechFinished { message_id } => {
            if app.speech.get(&message_id) == Some(&SpeechPhase::Playing) {
                app.speech.insert(message_id, SpeechPhase::Ready);
            }
            Vec::new()
        }
        UiEvent::ExportCompleted(result) => {
            match result {
                Ok(path) => app.notice = Some(format!("Exported to {}", path.display())),
                Err(error) => app.push_system(format!("Export failed: {error}")),
            }
            Vec::new()
        }
        UiEvent::ClipboardCopied => {
            app.notice = Some("Copied to clipboard".to_string());
            Vec::new()
        }
    }
}

fn handle_terminal_event(app: &mut AppState, event: Event) -> Vec<UiEffect> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key),
        Event::Paste(text) => {
            for ch in text.chars().filter(|c| *c != '\r') {
                if ch == '\n' {
                    app.input.insert(' ');
                } else {
                    app.input.insert(ch);
                }
            }
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn handle_key(app: &mut AppState, key: KeyEvent) -> Vec<UiEffect> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return handle_ctrl_key(app, key.code);
    }

    match key.code {
        KeyCode::Enter => submit(app),
        KeyCode::Esc => {
            if app.reveal.is_animating() {
                app.reveal.complete_active();
            } else {
                app.notice = None;
            }
            Vec::new()
        }
        KeyCode::Char(ch) => {
            app.input.insert(ch);
            Vec::new()
        }
        KeyCode::Backspace => {
            app.input.backspace();
            Vec::new()
        }
        KeyCode::Left => {
            app.input.move_left();
            Vec::new()
        }
        KeyCode::Right => {
            app.input.move_right();
            Vec::new()
        }
        KeyCode::Home => {
            app.input.move_home();
            Vec::new()
        }
        KeyCode::End => {
            app.input.move_end();
            Vec::new()
        }
        KeyCode::Up => {
            app.input.history_prev();
            Vec::new()
        }
        KeyCode::Down => {
            app.input.history_next();
            Vec::new()
        }
        KeyCode::PageUp => {
            app.scroll.scroll_up(SCROLL_PAGE, usize::MAX);
            Vec::new()
        }
        KeyCode::PageDown => {
            app.scroll.scroll_down(SCROLL_PAGE);
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn handle_ctrl_key(app: &mut AppState, code: KeyCode) -> Vec<UiEffect> {
    match code {
        KeyCode::Char('c') => vec![UiEffect::Quit],
        KeyCode::Char('r') => {
            app.show_reasoning = !app.show_reasoning;
            Vec::new()
        }
        KeyCode::Char('s') => toggle_last_speech(app),
        KeyCode::Char('e') => export_last(app),
        KeyCode::Char('y') => copy_last(app),
        KeyCode::Char('p') => toggle_last_pin(app),
        _ => Vec::new(),
    }
}

fn submit(app: &mut AppState) -> Vec<UiEffect> {
    let trimmed = app.input.buffer.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if let Some(command) = trimmed.strip_prefix('/') {
        let command = command.to_string();
        app.input.take();
        return handle_command(app, &command);
    }

    if app.phase.is_waiting() {
        app.notice = Some("Still waiting for the previous reply".to_string());
        return Vec::new();
    }

    let text = app.input.take();
    let message = ChatMessage::user(text);
    app.transcript.push(TranscriptCell::User {
        text: message.text.clone(),
    });
    app.messages.push(message.clone());
    app.phase = ChatPhase::Waiting;
    app.spinner_frame = 0;
    app.scroll.follow();

    vec![
        UiEffect::PersistMessage { message },
        UiEffect::SubmitPrompt {
            history: app.messages.clone(),
        },
    ]
}

fn handle_command(app: &mut AppState, command: &str) -> Vec<UiEffect> {
    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let arg = parts.next();

    match name {
        "quit" | "exit" => vec![UiEffect::Quit],
        "new" => start_new_session(app),
        "mode" => set_mode(app, arg),
        "grounding" => {
            match arg {
                Some("on") => app.config.grounding = true,
                Some("off") => app.config.grounding = false,
                _ => app.config.grounding = !app.config.grounding,
            }
            app.notice = Some(format!(
                "Web grounding {}",
                if app.config.grounding { "on" } else { "off" }
            ));
            Vec::new()
        }
        "reasoning" => {
            app.show_reasoning = !app.show_reasoning;
            app.notice = Some(format!(
                "Reasoning sections {}",
                if app.show_reasoning { "shown" } else { "hidden" }
            ));
            Vec::new()
        }
        "promotion" => {
            app.show_promotion = !app.show_promotion;
            app.notice = Some(format!(
                "Promotional footers {}",
                if app.show_promotion { "shown" } else { "hidden" }
            ));
            Vec::new()
        }
        "export" => export_last(app),
        "copy" => copy_last(app),
        "speak" => toggle_last_speech(app),
        "pin" => toggle_last_pin(app),
        "help" => {
            app.push_system(
                "Commands: /new /mode [short|detailed] /grounding [on|off] /reasoning \
                 /promotion /export /copy /speak /pin /quit",
            );
            Vec::new()
        }
        _ => {
            app.push_system(format!("Unknown command: /{name}"));
            Vec::new()
        }
    }
}

fn set_mode(app: &mut AppState, arg: Option<&str>) -> Vec<UiEffect> {
    let mode = match arg {
        Some("short") => ResponseMode::Short,
        Some("detailed") => ResponseMode::Detailed,
        _ => {
            app.push_system(format!(
                "Response mode is {}. Use /mode short or /mode detailed.",
                app.config.response_mode.display_name()
            ));
            return Vec::new();
        }
    };
    app.config.response_mode = mode;
    app.notice = Some(format!("Response mode set to {}", mode.display_name()));
    vec![UiEffect::PersistMode { mode }]
}

/// Clears the conversation and starts a fresh session log.
///
/// Speech playback and reveal state are torn down with the old transcript.
fn start_new_session(app: &mut AppState) -> Vec<UiEffect> {
    app.transcript.clear();
    app.messages.clear();
    app.speech.clear();
    app.reveal.reset();
    app.scroll.follow();
    app.phase = ChatPhase::Idle;

    if app.session.is_some() {
        match SessionLog::new() {
            Ok(session) => app.session = Some(session),
            Err(error) => app.push_system(format!("Failed to start a new session: {error}")),
        }
    }
    app.notice = Some("Started a new conversation".to_string());
    vec![UiEffect::CancelInflight, UiEffect::TeardownSpeech]
}

fn handle_reply(app: &mut AppState, result: Result<AssistantReply, String>) -> Vec<UiEffect> {
    app.phase = ChatPhase::Idle;

    let reply = match result {
        Ok(reply) => reply,
        Err(error) => {
            app.push_system(format!("Error: {error}"));
            return Vec::new();
        }
    };

    let cell = TranscriptCell::from_message(&reply.message);
    let with_reasoning = matches!(&cell, TranscriptCell::Assistant { sections, .. } if sections.reasoning.is_some());
    if app.config.typing_animation
        && let TranscriptCell::Assistant { id, sections, .. } = &cell
    {
        app.reveal.start(id, &sections.main_content);
    }
    app.transcript.push(cell);
    app.scroll.follow();

    let delta = UsageStats::exchange(
        reply.message.meta.grounded,
        with_reasoning,
        reply.prompt_tokens,
        reply.response_tokens,
    );
    app.messages.push(reply.message.clone());

    vec![
        UiEffect::PersistMessage {
            message: reply.message,
        },
        UiEffect::RecordExchange { delta },
    ]
}

/// Toggles speech for the most recent assistant reply.
///
/// First press synthesizes and then plays; while playing another press
/// pauses; a press while paused resumes. Presses during synthesis are
/// ignored.
fn toggle_last_speech(app: &mut AppState) -> Vec<UiEffect> {
    let Some((id, text)) = app.last_assistant() else {
        app.notice = Some("No reply to speak".to_string());
        return Vec::new();
    };
    let id = id.to_string();
    let text = text.to_string();

    match app.speech.get(&id) {
        None => {
            app.speech.insert(id.clone(), SpeechPhase::Synthesizing);
            app.notice = Some("Synthesizing speech...".to_string());
            vec![UiEffect::SynthesizeSpeech {
                message_id: id,
                text,
            }]
        }
        Some(SpeechPhase::Synthesizing) => Vec::new(),
        Some(SpeechPhase::Ready) => {
            app.speech.insert(id.clone(), SpeechPhase::Playing);
            vec![UiEffect::PlaySpeech { message_id: id }]
        }
        Some(SpeechPhase::Playing) => {
            app.speech.insert(id, SpeechPhase::Ready);
            vec![UiEffect::PauseSpeech]
        }
    }
}

fn handle_speech_synthesized(
    app: &mut AppState,
    message_id: &str,
    result: Result<(), String>,
) -> Vec<UiEffect> {
    // The owning message may have been removed while synthesis was in
    // flight, for instance by a session reset. Only a still-pending request
    // is allowed to start playback.
    if app.speech.get(message_id) != Some(&SpeechPhase::Synthesizing) {
        return Vec::new();
    }
    match result {
        Ok(()) => {
            // Audio is cached by the runtime before this event reaches us.
            app.speech
                .insert(message_id.to_string(), SpeechPhase::Playing);
            app.notice = None;
            vec![UiEffect::PlaySpeech {
                message_id: message_id.to_string(),
            }]
        }
        Err(error) => {
            app.speech.remove(message_id);
            app.push_system(format!("Speech synthesis failed: {error}"));
            Vec::new()
        }
    }
}

fn export_last(app: &mut AppState) -> Vec<UiEffect> {
    match app.last_assistant() {
        Some((_, text)) => vec![UiEffect::ExportHtml {
            body: text.to_string(),
        }],
        None => {
            app.notice = Some("No reply to export".to_string());
            Vec::new()
        }
    }
}

fn copy_last(app: &mut AppState) -> Vec<UiEffect> {
    match app.last_assistant() {
        Some((_, text)) => vec![UiEffect::CopyToClipboard {
            text: text.to_string(),
        }],
        None => {
            app.notice = Some("No reply to copy".to_string());
            Vec::new()
        }
    }
}

fn toggle_last_pin(app: &mut AppState) -> Vec<UiEffect> {
    let Some((id, _)) = app.last_assistant() else {
        app.notice = Some("No reply to pin".to_string());
        return Vec::new();
    };
    let message_id = id.to_string();

    if app.pins.contains(&message_id) {
        app.pins.remove(&message_id);
        app.notice = Some("Unpinned reply".to_string());
    } else {
        app.pins.insert(message_id.clone());
        app.notice = Some("Pinned reply".to_string());
    }
    vec![UiEffect::TogglePin { message_id }]
}
