//! Command handlers.

use anyhow::{Context, Result};
use rankchat_core::message::Role;
use rankchat_core::parse;
use rankchat_core::session;

pub mod ask;
pub mod chat;
pub mod config;
pub mod export;
pub mod sessions;
pub mod speak;

/// Main content of the last assistant message in the given (or latest) session.
fn latest_answer(session_id: Option<&str>) -> Result<String> {
    let id = match session_id {
        Some(id) => id.to_string(),
        None => session::latest_session_id()
            .context("find latest session id")?
            .context("No sessions found")?,
    };
    let messages =
        session::load_session_messages(&id).with_context(|| format!("load session '{id}'"))?;
    let reply = messages
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant)
        .with_context(|| format!("Session '{id}' has no assistant reply"))?;
    Ok(parse::extract(&reply.text).main_content)
}
