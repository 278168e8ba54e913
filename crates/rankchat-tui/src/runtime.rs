//! TUI runtime: owns the terminal, runs the event loop, executes effects.
//!
//! The reducer stays pure and produces effects; this module executes them.
//! Async handlers send their results back through a single "inbox" channel
//! that the runtime drains each frame.

use std::io::Stdout;
use std::future::Future;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use rankchat_core::config::{Config, paths};
use rankchat_core::export;
use rankchat_core::message::{ChatMessage, MessageMeta};
use rankchat_core::providers::gemini::{GeminiClient, GeminiConfig, GenerateOptions};
use rankchat_core::providers::tts::{TtsClient, TtsConfig};
use rankchat_core::session::SessionLog;
use rankchat_core::stats;
use rankchat_core::store::{self, FileStore};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::audio::SpeechController;
use crate::effects::UiEffect;
use crate::events::{AssistantReply, UiEvent};
use crate::state::AppState;
use crate::{render, terminal, update};

/// Tick cadence while the typing animation is running.
const ANIMATION_TICK: Duration = crate::reveal::REVEAL_TICK;

/// Tick cadence while waiting on the provider or playing audio.
const ACTIVE_TICK: Duration = Duration::from_millis(16);

/// Poll duration when nothing is happening.
const IDLE_TICK: Duration = Duration::from_millis(100);

type UiEventSender = mpsc::UnboundedSender<UiEvent>;
type UiEventReceiver = mpsc::UnboundedReceiver<UiEvent>;

/// Full-screen TUI runtime.
///
/// Owns the terminal, state, and audio device. Terminal state is restored on
/// drop, panic, or Ctrl+C.
pub struct TuiRuntime {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    pub state: AppState,
    speech: SpeechController,
    inbox_tx: UiEventSender,
    inbox_rx: UiEventReceiver,
    /// Cancels the in-flight provider request, if any.
    inflight: Option<CancellationToken>,
    last_tick: Instant,
}

impl TuiRuntime {
    /// Creates a new runtime.
    ///
    /// Must be called from within a tokio runtime; async effects are spawned
    /// onto it.
    pub fn new(config: Config, session: Option<SessionLog>) -> Result<Self> {
        Self::with_history(config, session, Vec::new())
    }

    /// Creates a runtime with a pre-loaded conversation (resumed session).
    pub fn with_history(
        config: Config,
        session: Option<SessionLog>,
        history: Vec<ChatMessage>,
    ) -> Result<Self> {
        terminal::install_panic_hook();
        let terminal = terminal::setup_terminal().context("Failed to setup terminal")?;

        let mut state = AppState::with_history(config, session, history);
        if let Ok(file_store) = FileStore::open_default() {
            state.pins = store::load_pins(&file_store).into_iter().collect();
        }
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();

        Ok(Self {
            terminal,
            state,
            speech: SpeechController::new(),
            inbox_tx,
            inbox_rx,
            inflight: None,
            last_tick: Instant::now(),
        })
    }

    /// Runs the main event loop until the user quits.
    pub fn run(&mut self) -> Result<()> {
        let mut dirty = true;

        while !self.state.should_quit {
            let mut events = self.collect_events()?;

            let size = self.terminal.size()?;
            events.insert(
                0,
                UiEvent::Frame {
                    width: size.width,
                    height: size.height,
                },
            );

            for event in events {
                let marks_dirty = !matches!(&event, UiEvent::Frame { .. });
                let effects = update::update(&mut self.state, event);
                if marks_dirty {
                    dirty = true;
                }
                self.execute_effects(effects);
            }

            if dirty {
                self.terminal.draw(|frame| {
                    render::render(&self.state, frame);
                })?;
                dirty = false;
            }
        }

        Ok(())
    }

    fn tick_interval(&self) -> Duration {
        if self.state.reveal.is_animating() {
            ANIMATION_TICK
        } else if self.state.phase.is_waiting() {
            ACTIVE_TICK
        } else {
            IDLE_TICK
        }
    }

    /// Collects events from the terminal, the inbox, and the tick timer.
    fn collect_events(&mut self) -> Result<Vec<UiEvent>> {
        let mut events = Vec::new();

        // Finished playback surfaces as an event so the reducer can update
        // the speech phase.
        if let Some(message_id) = self.speech.poll_finished() {
            events.push(UiEvent::SpeechFinished { message_id });
        }

        while let Ok(ev) = self.inbox_rx.try_recv() {
            self.intercept_inbox_event(&ev);
            events.push(ev);
        }

        let tick_interval = self.tick_interval();
        let time_until_tick = tick_interval.saturating_sub(self.last_tick.elapsed());
        let poll_duration = if events.is_empty() {
            time_until_tick
        } else {
            Duration::ZERO
        };

        if event::poll(poll_duration)? {
            events.push(UiEvent::Terminal(event::read()?));
            while event::poll(Duration::ZERO)? {
                events.push(UiEvent::Terminal(event::read()?));
            }
        }

        if self.last_tick.elapsed() >= tick_interval {
            events.push(UiEvent::Tick);
            self.last_tick = Instant::now();
        }

        Ok(events)
    }

    fn execute_effects(&mut self, effects: Vec<UiEffect>) {
        for effect in effects {
            self.execute_effect(effect);
        }
    }

    fn dispatch_event(&mut self, event: UiEvent) {
        let effects = update::update(&mut self.state, event);
        if !effects.is_empty() {
            self.execute_effects(effects);
        }
    }

    /// Spawns a pure async handler whose result is posted to the inbox.
    fn spawn_effect<F, Fut>(&self, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = UiEvent> + Send + 'static,
    {
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(f().await);
        });
    }

    fn execute_effect(&mut self, effect: UiEffect) {
        match effect {
            UiEffect::Quit => {
                self.state.should_quit = true;
            }

            UiEffect::SubmitPrompt { history } => {
                let config = self.state.config.clone();
                let token = CancellationToken::new();
                if let Some(previous) = self.inflight.replace(token.clone()) {
                    previous.cancel();
                }
                let tx = self.inbox_tx.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        () = token.cancelled() => {}
                        event = generate_reply(config, history) => {
                            let _ = tx.send(event);
                        }
                    }
                });
            }

            UiEffect::CancelInflight => {
                if let Some(token) = self.inflight.take() {
                    token.cancel();
                }
            }

            UiEffect::PersistMessage { message } => {
                if let Some(session) = self.state.session.as_mut() {
                    // Errors are silently ignored for session persistence.
                    let _ = session.append(&message);
                }
            }

            UiEffect::RecordExchange { delta } => {
                if let Ok(mut store) = FileStore::open_default()
                    && let Err(error) = stats::record_exchange(&mut store, delta)
                {
                    tracing::debug!(%error, "failed to record usage stats");
                }
            }

            UiEffect::PersistMode { mode } => {
                // Mode is already set in state; persistence failures are not fatal.
                let _ = Config::save_response_mode(mode);
            }

            UiEffect::TogglePin { message_id } => {
                match FileStore::open_default() {
                    Ok(mut store) => {
                        if let Err(error) = store::toggle_pin(&mut store, &message_id) {
                            tracing::debug!(%error, "failed to persist pin");
                        }
                    }
                    Err(error) => tracing::debug!(%error, "failed to open state store"),
                }
            }

            UiEffect::SynthesizeSpeech { message_id, text } => {
                if self.speech.has_audio(&message_id) {
                    self.dispatch_event(UiEvent::SpeechSynthesized {
                        message_id,
                        result: Ok(rankchat_core::providers::tts::SynthesizedAudio {
                            pcm: Vec::new(),
                            sample_rate: 0,
                        }),
                    });
                    return;
                }
                let config = self.state.config.clone();
                self.spawn_effect(move || synthesize_speech(config, message_id, text));
            }

            UiEffect::PlaySpeech { message_id } => {
                if let Err(error) = self.speech.play(&message_id) {
                    self.state.speech.remove(&message_id);
                    self.state.notice = Some(format!("Playback failed: {error:#}"));
                }
            }

            UiEffect::PauseSpeech => {
                if let Err(error) = self.speech.pause() {
                    tracing::debug!(%error, "failed to pause playback");
                }
            }

            UiEffect::TeardownSpeech => {
                self.speech.teardown(None);
            }

            UiEffect::ExportHtml { body } => {
                let event = match export_html(&body) {
                    Ok(path) => UiEvent::ExportCompleted(Ok(path)),
                    Err(error) => UiEvent::ExportCompleted(Err(format!("{error:#}"))),
                };
                self.dispatch_event(event);
            }

            UiEffect::CopyToClipboard { text } => {
                let copied = arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text));
                match copied {
                    Ok(()) => self.dispatch_event(UiEvent::ClipboardCopied),
                    Err(error) => {
                        self.state.notice = Some(format!("Copy failed: {error}"));
                    }
                }
            }
        }
    }

    /// Caches synthesized audio before the reducer sees the event, so the
    /// follow-up `PlaySpeech` effect finds it.
    fn intercept_inbox_event(&mut self, event: &UiEvent) {
        if let UiEvent::SpeechSynthesized {
            message_id,
            result: Ok(audio),
        } = event
            && !self.speech.has_audio(message_id)
        {
            self.speech.store(message_id, audio.clone());
        }
    }
}

impl Drop for TuiRuntime {
    fn drop(&mut self) {
        let _ = terminal::restore_terminal();
    }
}

/// Sends the conversation to Gemini and wraps the reply for the inbox.
async fn generate_reply(config: Config, history: Vec<ChatMessage>) -> UiEvent {
    let result = async {
        let gemini = GeminiConfig::from_env(
            config.model.clone(),
            config.providers.gemini.effective_base_url(),
            config.providers.gemini.effective_api_key(),
        )?;
        let options = GenerateOptions {
            system_prompt: config.effective_system_prompt()?,
            grounding: config.grounding,
            mode: config.response_mode,
            max_output_tokens: config.max_output_tokens,
            attachments: Vec::new(),
        };
        let reply = GeminiClient::new(gemini).generate(&history, &options).await?;
        let meta = MessageMeta {
            grounded: config.grounding,
            thinking: false,
            mode: config.response_mode,
            model: Some(config.model.clone()),
        };
        anyhow::Ok(AssistantReply {
            message: ChatMessage::assistant(reply.text, reply.sources, meta),
            prompt_tokens: reply.prompt_tokens,
            response_tokens: reply.response_tokens,
        })
    }
    .await;

    UiEvent::ReplyReceived(Box::new(result.map_err(|e| format!("{e:#}"))))
}

/// Synthesizes speech for a message and wraps the audio for the inbox.
async fn synthesize_speech(config: Config, message_id: String, text: String) -> UiEvent {
    let result = async {
        let tts = TtsConfig::from_env(
            config.tts.model.clone(),
            config.tts.voice.clone(),
            config.providers.gemini.effective_base_url(),
            config.providers.gemini.effective_api_key(),
        )?;
        TtsClient::new(tts).synthesize(&text).await
    }
    .await;

    UiEvent::SpeechSynthesized {
        message_id,
        result: result.map_err(|e| format!("{e:#}")),
    }
}

/// Renders the print document and writes it to the exports directory.
fn export_html(body: &str) -> Result<std::path::PathBuf> {
    let html = export::to_printable_html(body);
    let dir = paths::exports_dir();
    std::fs::create_dir_all(&dir).context("Failed to create exports directory")?;
    let filename = format!(
        "seo-report-{}.html",
        chrono::Utc::now().format("%Y%m%d-%H%M%S")
    );
    let path = dir.join(filename);
    std::fs::write(&path, html).context("Failed to write export file")?;
    // Best effort; the path is surfaced either way.
    let _ = open::that(&path);
    Ok(path)
}
