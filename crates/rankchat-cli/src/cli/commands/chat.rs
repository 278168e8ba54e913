//! Interactive chat command handler.

use anyhow::{Context, Result};
use rankchat_core::config::Config;
use rankchat_core::message::ChatMessage;
use rankchat_core::session::{self, SessionLog};

use super::super::SessionArgs;

pub fn run(config: Config, session_args: &SessionArgs) -> Result<()> {
    let (session, history) = resolve_session(session_args)?;
    rankchat_tui::run_interactive_chat(config, session, history).context("chat failed")
}

/// Opens the requested session, or starts a fresh one.
fn resolve_session(args: &SessionArgs) -> Result<(Option<SessionLog>, Vec<ChatMessage>)> {
    if args.no_save {
        return Ok((None, Vec::new()));
    }
    match &args.session {
        Some(id) => {
            let history = session::load_session_messages(id)
                .with_context(|| format!("load session '{id}'"))?;
            let log = SessionLog::with_id(id.clone())
                .with_context(|| format!("open session '{id}'"))?;
            Ok((Some(log), history))
        }
        None => {
            let log = SessionLog::new().context("create session")?;
            Ok((Some(log), Vec::new()))
        }
    }
}
