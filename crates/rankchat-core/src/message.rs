//! Chat message model.
//!
//! A message's raw text is the canonical record and never mutates after
//! creation. Everything derived from it (parsed sections, reveal progress,
//! print HTML) is computed on demand so it can never drift from the stored
//! text.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Display label used in transcripts and exports.
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "Assistant",
        }
    }
}

/// One web citation attached to an assistant response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

/// Answer verbosity requested from the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    Short,
    #[default]
    Detailed,
}

impl ResponseMode {
    pub fn display_name(self) -> &'static str {
        match self {
            ResponseMode::Short => "short",
            ResponseMode::Detailed => "detailed",
        }
    }
}

/// Structured metadata recorded with a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageMeta {
    /// Response was grounded with web search.
    pub grounded: bool,
    /// Reasoning mode was requested for this turn.
    pub thinking: bool,
    /// Verbosity mode active when the message was created.
    pub mode: ResponseMode,
    /// Model label, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// A single entry in the session log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Creation-time sortable unique id (UUIDv7).
    pub id: String,
    pub role: Role,
    /// Raw text exactly as submitted or returned. Immutable after creation.
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub meta: MessageMeta,
    /// RFC3339 UTC creation timestamp.
    pub ts: String,
}

impl ChatMessage {
    /// Creates a new user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: generate_message_id(),
            role: Role::User,
            text: text.into(),
            sources: Vec::new(),
            meta: MessageMeta::default(),
            ts: timestamp(),
        }
    }

    /// Creates a new assistant message with de-duplicated sources.
    pub fn assistant(text: impl Into<String>, sources: Vec<Source>, meta: MessageMeta) -> Self {
        Self {
            id: generate_message_id(),
            role: Role::Assistant,
            text: text.into(),
            sources: dedupe_sources(sources),
            meta,
            ts: timestamp(),
        }
    }
}

/// Removes duplicate citations by `uri`, preserving first-seen order.
///
/// The first occurrence's title wins for each unique uri.
pub fn dedupe_sources(sources: Vec<Source>) -> Vec<Source> {
    let mut seen = std::collections::HashSet::new();
    sources
        .into_iter()
        .filter(|s| seen.insert(s.uri.clone()))
        .collect()
}

/// Generates a creation-time sortable message id.
fn generate_message_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Returns an RFC3339 UTC timestamp string.
pub(crate) fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
