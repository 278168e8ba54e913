//! Full-screen chat TUI for RankChat.
//!
//! The architecture follows the Elm shape: a pure reducer
//! (`update::update`) consumes `UiEvent`s and returns `UiEffect`s, and the
//! runtime executes the effects (network, disk, audio, clipboard).

pub mod audio;
pub mod effects;
pub mod events;
pub mod markdown;
pub mod render;
pub mod reveal;
pub mod runtime;
pub mod state;
pub mod terminal;
pub mod update;

use std::io::{IsTerminal, Write};

use anyhow::{Context, Result, bail};
use rankchat_core::config::Config;
use rankchat_core::message::ChatMessage;
use rankchat_core::session::{SessionLog, short_session_id};

use crate::runtime::TuiRuntime;

/// Runs the interactive chat TUI until the user quits.
///
/// Must be called from within a tokio runtime. Refuses to start when stdout
/// is not a terminal.
pub fn run_interactive_chat(
    config: Config,
    session: Option<SessionLog>,
    history: Vec<ChatMessage>,
) -> Result<()> {
    if !std::io::stdout().is_terminal() {
        bail!("Interactive chat requires a terminal. Use `rankchat ask` for scripted output.");
    }

    // Startup info goes to stderr before the alternate screen takes over.
    let mut stderr = std::io::stderr();
    if let Some(session) = &session {
        if history.is_empty() {
            let _ = writeln!(stderr, "Session: {}", short_session_id(&session.id));
        } else {
            let _ = writeln!(
                stderr,
                "Resuming session {} ({} messages)",
                short_session_id(&session.id),
                history.len()
            );
        }
    }

    let mut runtime = TuiRuntime::with_history(config, session, history)
        .context("Failed to start the chat interface")?;
    let result = runtime.run();
    drop(runtime);

    println!("Goodbye!");
    result
}
