//! UI event types.
//!
//! Events are the only input to the reducer. They arrive from the terminal,
//! the tick timer, and async handlers posting results back through the inbox.

use std::path::PathBuf;

use rankchat_core::message::ChatMessage;
use rankchat_core::providers::tts::SynthesizedAudio;

/// Events processed by the reducer.
#[derive(Debug)]
pub enum UiEvent {
    /// Frame boundary with current terminal size. Emitted first each loop pass.
    Frame { width: u16, height: u16 },

    /// Periodic tick driving the spinner and the typing animation.
    Tick,

    /// Raw terminal input.
    Terminal(crossterm::event::Event),

    /// A generation request finished.
    ReplyReceived(Box<Result<AssistantReply, String>>),

    /// Speech synthesis finished for a message.
    SpeechSynthesized {
        message_id: String,
        result: Result<SynthesizedAudio, String>,
    },

    /// Playback for a message ran to the end of its audio.
    SpeechFinished { message_id: String },

    /// An HTML export finished.
    ExportCompleted(Result<PathBuf, String>),

    /// Text was copied to the system clipboard.
    ClipboardCopied,
}

/// A completed exchange from the provider, ready to enter the transcript.
#[derive(Debug)]
pub struct AssistantReply {
    pub message: ChatMessage,
    pub prompt_tokens: u64,
    pub response_tokens: u64,
}
