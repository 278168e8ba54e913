//! One-shot ask command handler.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rankchat_core::config::Config;
use rankchat_core::message::{ChatMessage, MessageMeta};
use rankchat_core::parse;
use rankchat_core::providers::gemini::{Attachment, GeminiClient, GeminiConfig, GenerateOptions};
use rankchat_core::session::SessionLog;
use rankchat_core::stats::{self, UsageStats};
use rankchat_core::store::FileStore;

use super::super::SessionArgs;

/// Output shaping flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub raw: bool,
    pub json: bool,
    pub show_reasoning: bool,
}

pub async fn run(
    config: &Config,
    session_args: &SessionArgs,
    prompt: &str,
    attach: Option<&Path>,
    output: Output,
) -> Result<()> {
    let prompt = prompt.trim();
    anyhow::ensure!(!prompt.is_empty(), "Prompt is empty");

    let gemini = GeminiConfig::from_env(
        config.model.clone(),
        config.providers.gemini.effective_base_url(),
        config.providers.gemini.effective_api_key(),
    )?;
    let client = GeminiClient::new(gemini);

    let user = ChatMessage::user(prompt);
    let mut history = load_history(session_args)?;
    history.push(user.clone());

    let attachments = match attach {
        Some(path) => vec![load_attachment(path)?],
        None => vec![],
    };

    let options = GenerateOptions {
        system_prompt: config.effective_system_prompt()?,
        grounding: config.grounding,
        mode: config.response_mode,
        max_output_tokens: config.max_output_tokens,
        attachments,
    };
    let reply = client
        .generate(&history, &options)
        .await
        .context("generate reply")?;

    let sections = parse::extract(&reply.text);
    let meta = MessageMeta {
        grounded: config.grounding,
        thinking: false,
        mode: config.response_mode,
        model: Some(config.model.clone()),
    };
    let assistant = ChatMessage::assistant(reply.text.clone(), reply.sources.clone(), meta);

    if output.raw {
        println!("{}", reply.text);
    } else if output.json {
        let payload = serde_json::json!({
            "reasoning": sections.reasoning,
            "main_content": sections.main_content,
            "promotion": sections.promotion,
            "sources": reply.sources,
            "prompt_tokens": reply.prompt_tokens,
            "response_tokens": reply.response_tokens,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        if output.show_reasoning
            && let Some(reasoning) = &sections.reasoning
        {
            println!("Reasoning:");
            println!("{reasoning}");
            println!();
        }
        println!("{}", sections.main_content);
        if !reply.sources.is_empty() {
            println!();
            println!("Sources:");
            for (i, source) in reply.sources.iter().enumerate() {
                println!("  {}. {} - {}", i + 1, source.title, source.uri);
            }
        }
    }

    if !session_args.no_save {
        persist(session_args, &user, &assistant)?;
    }

    let mut store = FileStore::open_default().context("open state store")?;
    let delta = UsageStats::exchange(
        config.grounding,
        sections.reasoning.is_some(),
        reply.prompt_tokens,
        reply.response_tokens,
    );
    stats::record_exchange(&mut store, delta).context("record usage")?;

    Ok(())
}

fn load_history(session_args: &SessionArgs) -> Result<Vec<ChatMessage>> {
    match &session_args.session {
        Some(id) => rankchat_core::session::load_session_messages(id)
            .with_context(|| format!("load session '{id}'")),
        None => Ok(Vec::new()),
    }
}

fn persist(session_args: &SessionArgs, user: &ChatMessage, assistant: &ChatMessage) -> Result<()> {
    let mut log = match &session_args.session {
        Some(id) => {
            SessionLog::with_id(id.clone()).with_context(|| format!("open session '{id}'"))?
        }
        None => SessionLog::new().context("create session")?,
    };
    log.append(user).context("save prompt")?;
    log.append(assistant).context("save reply")?;
    Ok(())
}

fn load_attachment(path: &Path) -> Result<Attachment> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());
    let mime_type = guess_mime(&name).to_string();
    Ok(Attachment {
        name,
        mime_type,
        data: BASE64.encode(bytes),
        inline: true,
    })
}

/// Extension-based mime lookup for the formats the assistant accepts.
fn guess_mime(name: &str) -> &'static str {
    match name.rsplit('.').next().map(str::to_ascii_lowercase).as_deref() {
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("html" | "htm") => "text/html",
        Some("md") => "text/markdown",
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "text/plain",
    }
}
