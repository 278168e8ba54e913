//! Session command handlers.

use anyhow::{Context, Result};
use comfy_table::{ContentArrangement, Table};
use rankchat_core::config::Config;
use rankchat_core::session::{
    self, SessionLog, format_timestamp_relative, short_session_id,
};
use rankchat_core::stats::{self, UsageStats};
use rankchat_core::store::FileStore;

pub fn list() -> Result<()> {
    let sessions = session::list_sessions().context("list sessions")?;
    if sessions.is_empty() {
        println!("No sessions found.");
    } else {
        for info in sessions {
            let modified_str = info
                .modified
                .map(format_timestamp_relative)
                .unwrap_or_else(|| "unknown".to_string());
            println!("{}  {}  {}", info.display_title(), info.id, modified_str);
        }
    }
    Ok(())
}

pub fn show(id: &str) -> Result<()> {
    let messages =
        session::load_session_messages(id).with_context(|| format!("load session '{id}'"))?;
    if messages.is_empty() {
        println!("Session '{id}' is empty or not found.");
    } else {
        println!("{}", session::format_transcript(&messages));
    }
    Ok(())
}

pub fn resume(id: Option<String>, config: Config) -> Result<()> {
    let session_id = match id {
        Some(id) => id,
        None => session::latest_session_id()
            .context("find latest session id")?
            .context("No sessions found to resume")?,
    };

    let history = session::load_session_messages(&session_id)
        .with_context(|| format!("load history for '{session_id}'"))?;
    let log = SessionLog::with_id(session_id.clone())
        .with_context(|| format!("open session '{session_id}'"))?;

    rankchat_tui::run_interactive_chat(config, Some(log), history).context("resume chat failed")
}

pub fn rename(id: &str, title: &str) -> Result<()> {
    let normalized = session::set_session_title(id, Some(title.to_string()))
        .with_context(|| format!("rename session '{id}'"))?;
    let display_title = normalized.unwrap_or_else(|| short_session_id(id));
    println!("Renamed session {id} to {display_title}");
    Ok(())
}

pub fn delete(id: &str) -> Result<()> {
    session::delete_session(id).with_context(|| format!("delete session '{id}'"))?;
    println!("Deleted session {id}");
    Ok(())
}

pub fn clear() -> Result<()> {
    let removed = session::clear_sessions().context("clear sessions")?;
    // No sessions left means no message a pin could refer to.
    let mut store = FileStore::open_default().context("open state store")?;
    rankchat_core::store::retain_pins(&mut store, &[]).context("drop stale pins")?;
    println!("Deleted {removed} session(s).");
    Ok(())
}

pub fn stats(reset: bool) -> Result<()> {
    let mut store = FileStore::open_default().context("open state store")?;

    if reset {
        stats::reset_stats(&mut store).context("reset stats")?;
        println!("Usage statistics reset.");
        return Ok(());
    }

    let usage = stats::load_stats(&store);
    if usage.is_empty() {
        println!("No usage recorded yet.");
        return Ok(());
    }
    println!("{}", stats_table(&usage));
    Ok(())
}

fn stats_table(usage: &UsageStats) -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec!["Exchanges".to_string(), usage.exchanges.to_string()]);
    table.add_row(vec!["Grounded".to_string(), usage.grounded.to_string()]);
    table.add_row(vec![
        "With reasoning".to_string(),
        usage.with_reasoning.to_string(),
    ]);
    table.add_row(vec![
        "Prompt tokens".to_string(),
        usage.prompt_tokens.to_string(),
    ]);
    table.add_row(vec![
        "Response tokens".to_string(),
        usage.response_tokens.to_string(),
    ]);
    table.add_row(vec![
        "Total tokens".to_string(),
        usage.total_tokens().to_string(),
    ]);
    table
}
