//! UI effect types.
//!
//! Effects are commands returned by the reducer that the runtime executes.
//! They represent I/O only (network, disk, audio device, clipboard). The
//! reducer stays pure: it mutates state and returns effects, never performs
//! I/O itself.

use rankchat_core::message::{ChatMessage, ResponseMode};
use rankchat_core::stats::UsageStats;

/// Effects returned by the reducer for the runtime to execute.
#[derive(Debug)]
pub enum UiEffect {
    /// Quit the application.
    Quit,

    /// Send the conversation to the provider and post the reply to the inbox.
    SubmitPrompt { history: Vec<ChatMessage> },

    /// Drop any in-flight provider request so its reply never arrives.
    CancelInflight,

    /// Append a message to the session log.
    PersistMessage { message: ChatMessage },

    /// Accumulate usage counters in the state store.
    RecordExchange { delta: UsageStats },

    /// Persist the response mode preference to the config file.
    PersistMode { mode: ResponseMode },

    /// Flip a message's pinned state in the state store.
    TogglePin { message_id: String },

    /// Synthesize speech for a message and post the audio to the inbox.
    SynthesizeSpeech { message_id: String, text: String },

    /// Start or resume playback of cached audio.
    PlaySpeech { message_id: String },

    /// Pause the current playback.
    PauseSpeech,

    /// Stop playback and drop all cached audio.
    TeardownSpeech,

    /// Render the text as a print-ready HTML document and open it.
    ExportHtml { body: String },

    /// Copy text to the system clipboard.
    CopyToClipboard { text: String },
}
