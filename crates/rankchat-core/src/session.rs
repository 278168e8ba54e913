//! Session persistence for RankChat.
//!
//! Each chat session is stored as a JSONL file where each line is a JSON
//! object. The first line is a meta event carrying the schema version; every
//! following line is one message.
//!
//! ## Schema v1 Format
//!
//! ```jsonl
//! { "type": "meta", "schema_version": 1, "ts": "2026-02-10T09:12:44Z" }
//! { "type": "message", "id": "...", "role": "user", "text": "...", "ts": "..." }
//! { "type": "message", "id": "...", "role": "assistant", "text": "...", "sources": [...], "ts": "..." }
//! ```

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::paths::sessions_dir;
use crate::message::{ChatMessage, Role};
use crate::parse;

/// Current schema version for new sessions.
pub const SCHEMA_VERSION: u32 = 1;

/// A session event (polymorphic, tag-based).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Meta event: first line of a session file.
    Meta {
        schema_version: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        ts: String,
    },

    /// One chat message.
    Message {
        #[serde(flatten)]
        message: ChatMessage,
    },
}

impl SessionEvent {
    /// Creates a new meta event.
    pub fn meta() -> Self {
        Self::Meta {
            schema_version: SCHEMA_VERSION,
            title: None,
            ts: chrono_timestamp(),
        }
    }

    /// Wraps a chat message.
    pub fn message(message: ChatMessage) -> Self {
        Self::Message { message }
    }
}

/// Returns an RFC3339 UTC timestamp string.
fn chrono_timestamp() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

fn normalize_title(title: impl Into<String>) -> Option<String> {
    let trimmed = title.into().trim().to_string();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

/// Returns a shortened session ID for display.
pub fn short_session_id(id: &str) -> String {
    if id.len() > 8 {
        format!("{}…", &id[..8])
    } else {
        id.to_string()
    }
}

/// Truncates a string to at most `max_bytes` without splitting a UTF-8 character.
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Manages one session file.
#[derive(Debug, Clone)]
pub struct SessionLog {
    pub id: String,
    path: PathBuf,
    /// Whether this is a new session (needs meta event written).
    is_new: bool,
}

impl SessionLog {
    /// Returns the path to the session file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Guard to prevent session creation in tests without proper isolation.
    ///
    /// # Panics
    /// - In unit tests (`#[cfg(test)]`): panics if `RANKCHAT_HOME` is not set
    /// - At runtime: panics if `RANKCHAT_BLOCK_SESSION_WRITES=1` is set
    fn guard_session_creation() {
        #[cfg(test)]
        if std::env::var("RANKCHAT_HOME").is_err() {
            panic!(
                "Tests must set RANKCHAT_HOME to a temp directory!\n\
                 SessionLog would be created in the user's home directory.\n\
                 Use `setup_temp_home()` or set RANKCHAT_HOME env var."
            );
        }

        #[cfg(not(test))]
        if std::env::var("RANKCHAT_BLOCK_SESSION_WRITES").is_ok_and(|v| v == "1") {
            panic!(
                "RANKCHAT_BLOCK_SESSION_WRITES=1 but trying to create a session!\n\
                 Use --no-save or set RANKCHAT_HOME to a temp directory."
            );
        }
    }

    /// Creates a new session with a fresh ID.
    pub fn new() -> Result<Self> {
        Self::with_id(generate_session_id())
    }

    /// Creates or opens a session with a specific ID.
    ///
    /// # Panics
    /// In tests, panics if `RANKCHAT_HOME` is not set.
    pub fn with_id(id: String) -> Result<Self> {
        Self::guard_session_creation();

        let dir = sessions_dir();
        fs::create_dir_all(&dir).context("Failed to create sessions directory")?;

        let path = dir.join(format!("{id}.jsonl"));
        let is_new = !path.exists();

        Ok(Self { id, path, is_new })
    }

    /// Ensures the meta event is written for new sessions.
    fn ensure_meta(&mut self) -> Result<()> {
        if self.is_new {
            self.append_raw(&SessionEvent::meta())?;
            self.is_new = false;
        }
        Ok(())
    }

    /// Appends an event to the session file (internal, no meta check).
    fn append_raw(&self, event: &SessionEvent) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .context("Failed to open session file")?;

        let json = serde_json::to_string(event).context("Failed to serialize event")?;
        writeln!(file, "{json}").context("Failed to write to session file")?;

        Ok(())
    }

    /// Appends a message to the session file.
    ///
    /// For new sessions, automatically writes the meta event first.
    pub fn append(&mut self, message: &ChatMessage) -> Result<()> {
        self.ensure_meta()?;
        self.append_raw(&SessionEvent::message(message.clone()))
    }

    /// Reads all events from the session file.
    pub fn read_events(&self) -> Result<Vec<SessionEvent>> {
        read_session_events(&self.path)
    }

    /// Reads only the messages, dropping the meta line.
    pub fn messages(&self) -> Result<Vec<ChatMessage>> {
        Ok(self
            .read_events()?
            .into_iter()
            .filter_map(|event| match event {
                SessionEvent::Message { message } => Some(message),
                SessionEvent::Meta { .. } => None,
            })
            .collect())
    }

    /// Updates the session title stored in the meta event.
    ///
    /// The update is performed atomically via write-to-temp-then-rename.
    pub fn set_title(&mut self, title: Option<String>) -> Result<Option<String>> {
        self.ensure_meta()?;
        let normalized = title.and_then(normalize_title);
        rewrite_meta_with_title(&self.path, normalized.clone())?;
        Ok(normalized)
    }
}

/// Reads session events from a file path, skipping unparseable lines.
fn read_session_events(path: &PathBuf) -> Result<Vec<SessionEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = fs::File::open(path).context("Failed to open session file")?;
    let reader = BufReader::new(file);
    let mut events = Vec::new();

    for line in reader.lines() {
        let line = line.context("Failed to read line")?;
        if line.trim().is_empty() {
            continue;
        }

        if let Ok(event) = serde_json::from_str::<SessionEvent>(&line) {
            events.push(event);
        }
        // Skip unparseable lines (best-effort)
    }

    Ok(events)
}

/// Rewrites the meta event with an updated title, preserving the rest of the file.
fn rewrite_meta_with_title(path: &PathBuf, title: Option<String>) -> Result<()> {
    let file = fs::File::open(path).context("Failed to open session file")?;
    let reader = BufReader::new(file);

    let temp_path = path.with_extension("jsonl.tmp");
    let mut temp = fs::File::create(&temp_path).context("Failed to create temp session file")?;

    let mut lines = reader.lines();
    let first_line = lines
        .next()
        .transpose()
        .context("Failed to read meta line")?
        .ok_or_else(|| anyhow!("Session file is empty"))?;

    let mut meta_event: SessionEvent =
        serde_json::from_str(&first_line).context("Failed to parse meta event")?;
    match meta_event {
        SessionEvent::Meta {
            title: ref mut meta_title,
            ..
        } => {
            *meta_title = title;
        }
        SessionEvent::Message { .. } => bail!("First session event is not a meta event"),
    }

    let new_meta =
        serde_json::to_string(&meta_event).context("Failed to serialize updated meta event")?;
    writeln!(temp, "{new_meta}").context("Failed to write updated meta")?;

    for line in lines {
        let line = line.context("Failed to read session line")?;
        writeln!(temp, "{line}").context("Failed to write session line")?;
    }

    temp.sync_all().context("Failed to sync temp session file")?;
    fs::rename(&temp_path, path).context("Failed to replace session file")?;
    Ok(())
}

/// Reads only the meta line to extract the title.
fn read_meta_title(path: &Path) -> Option<String> {
    let file = fs::File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let mut first_line = String::new();

    loop {
        first_line.clear();
        let bytes = reader.read_line(&mut first_line).ok()?;
        if bytes == 0 {
            return None;
        }
        if !first_line.trim().is_empty() {
            break;
        }
    }

    match serde_json::from_str::<SessionEvent>(&first_line) {
        Ok(SessionEvent::Meta { title, .. }) => title,
        _ => None,
    }
}

/// Generates a creation-time sortable session ID.
fn generate_session_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Summary information about a saved session.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub id: String,
    pub title: Option<String>,
    pub modified: Option<SystemTime>,
}

impl SessionSummary {
    /// Returns a display-friendly title (or short ID fallback).
    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| short_session_id(&self.id))
    }
}

/// Lists all saved sessions, sorted by modification time (newest first).
pub fn list_sessions() -> Result<Vec<SessionSummary>> {
    let dir = sessions_dir();

    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut sessions = Vec::new();

    for entry in fs::read_dir(&dir).context("Failed to read sessions directory")? {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();

        if path.extension().is_some_and(|ext| ext == "jsonl")
            && let Some(stem) = path.file_stem()
        {
            let id = stem.to_string_lossy().to_string();
            let modified = entry.metadata().ok().and_then(|m| m.modified().ok());
            let title = read_meta_title(&path);

            sessions.push(SessionSummary {
                id,
                title,
                modified,
            });
        }
    }

    sessions.sort_by(|a, b| b.modified.cmp(&a.modified));

    Ok(sessions)
}

/// Returns the ID of the most recently modified session.
pub fn latest_session_id() -> Result<Option<String>> {
    let sessions = list_sessions()?;
    Ok(sessions.into_iter().next().map(|s| s.id))
}

/// Loads the messages of a session by ID.
pub fn load_session_messages(id: &str) -> Result<Vec<ChatMessage>> {
    let session = SessionLog::with_id(id.to_string())?;
    session.messages()
}

/// Updates a session's title by ID.
pub fn set_session_title(id: &str, title: Option<String>) -> Result<Option<String>> {
    let path = sessions_dir().join(format!("{id}.jsonl"));
    if !path.exists() {
        bail!("Session '{id}' not found");
    }

    let mut session = SessionLog::with_id(id.to_string())?;
    session.set_title(title)
}

/// Deletes a session file by ID.
pub fn delete_session(id: &str) -> Result<()> {
    let path = sessions_dir().join(format!("{id}.jsonl"));
    if !path.exists() {
        bail!("Session '{id}' not found");
    }
    fs::remove_file(&path)
        .with_context(|| format!("Failed to delete session {}", path.display()))
}

/// Deletes all session files. Returns how many were removed.
pub fn clear_sessions() -> Result<usize> {
    let dir = sessions_dir();
    if !dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(&dir).context("Failed to read sessions directory")? {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "jsonl") {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete session {}", path.display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Formats a session transcript in a human-readable format.
///
/// Assistant messages are run through section extraction so reasoning and
/// promotion blocks appear under their own headers.
pub fn format_transcript(messages: &[ChatMessage]) -> String {
    let mut output = String::new();

    for message in messages {
        match message.role {
            Role::User => {
                output.push_str("### You\n");
                output.push_str(&message.text);
                output.push_str("\n\n");
            }
            Role::Assistant => {
                let sections = parse::extract(&message.text);

                if let Some(reasoning) = &sections.reasoning {
                    output.push_str("### Reasoning\n");
                    if reasoning.len() > 500 {
                        output.push_str(truncate_str(reasoning, 500));
                        output.push_str("...");
                    } else {
                        output.push_str(reasoning);
                    }
                    output.push_str("\n\n");
                }

                output.push_str("### Assistant\n");
                output.push_str(&sections.main_content);
                output.push_str("\n\n");

                if !message.sources.is_empty() {
                    output.push_str("Sources:\n");
                    for source in &message.sources {
                        output.push_str(&format!("- {} <{}>\n", source.title, source.uri));
                    }
                    output.push('\n');
                }
            }
        }
    }

    output.trim_end().to_string()
}

/// Formats a SystemTime as a simple date/time string (YYYY-MM-DD HH:MM).
pub fn format_timestamp(time: SystemTime) -> String {
    let datetime: DateTime<Utc> = time.into();
    datetime.format("%Y-%m-%d %H:%M").to_string()
}

/// Formats a SystemTime as a short relative age (e.g., "2m ago", "3h ago").
pub fn format_timestamp_relative(time: SystemTime) -> String {
    let datetime: DateTime<Utc> = time.into();
    let now = Utc::now();
    let seconds = now.signed_duration_since(datetime).num_seconds().max(0);

    let mins = seconds / 60;
    if mins < 1 {
        return "just now".to_string();
    }
    if mins < 60 {
        return format!("{mins}m ago");
    }

    let hours = mins / 60;
    if hours < 24 {
        return format!("{hours}h ago");
    }

    let days = hours / 24;
    if days < 7 {
        return format!("{days}d ago");
    }

    let weeks = days / 7;
    if weeks < 5 {
        return format!("{weeks}w ago");
    }

    let months = days / 30;
    if months < 12 {
        return format!("{months}mo ago");
    }

    let years = days / 365;
    format!("{years}y ago")
}
