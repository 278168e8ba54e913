//! Speak command handler.

use std::path::Path;

use anyhow::{Context, Result};
use rankchat_core::config::Config;
use rankchat_core::providers::tts::{TtsClient, TtsConfig};

use super::latest_answer;

pub async fn run(
    config: &Config,
    session_id: Option<&str>,
    text: Option<String>,
    out: &Path,
) -> Result<()> {
    let text = match text {
        Some(text) => text,
        None => latest_answer(session_id)?,
    };
    let text = text.trim();
    anyhow::ensure!(!text.is_empty(), "Nothing to speak");

    let tts = TtsConfig::from_env(
        config.tts.model.clone(),
        config.tts.voice.clone(),
        config.providers.gemini.effective_base_url(),
        config.providers.gemini.effective_api_key(),
    )?;
    let audio = TtsClient::new(tts)
        .synthesize(text)
        .await
        .context("synthesize speech")?;

    rankchat_tui::audio::write_wav(out, &audio)
        .with_context(|| format!("write {}", out.display()))?;
    println!(
        "Wrote {} ({:.1}s)",
        out.display(),
        audio.duration_ms() as f64 / 1000.0
    );
    Ok(())
}
