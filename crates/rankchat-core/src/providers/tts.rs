//! Gemini speech synthesis.
//!
//! Synthesizes a message's answer text into raw PCM16 audio. The caller owns
//! playback; this module only produces the samples.

use anyhow::{Context, Result, bail};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{Value, json};
use tracing::debug;

use super::{error_body_snippet, resolve_api_key, resolve_base_url};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Sample rate the API returns when the mime type omits one.
const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Speech synthesis configuration.
#[derive(Debug, Clone)]
pub struct TtsConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub voice: String,
}

impl TtsConfig {
    /// Creates a new config from the config file and environment.
    ///
    /// Shares key and base-URL resolution with the chat client: config value
    /// first, then `GEMINI_API_KEY` / `GEMINI_BASE_URL`.
    pub fn from_env(
        model: String,
        voice: String,
        config_base_url: Option<&str>,
        config_api_key: Option<&str>,
    ) -> Result<Self> {
        let api_key = resolve_api_key(config_api_key, "GEMINI_API_KEY", "gemini")?;
        let base_url = resolve_base_url(
            config_base_url,
            "GEMINI_BASE_URL",
            DEFAULT_BASE_URL,
            "Gemini",
        )?;

        Ok(Self {
            api_key,
            base_url,
            model,
            voice,
        })
    }
}

/// Decoded synthesis result: 16-bit little-endian mono PCM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    pub pcm: Vec<u8>,
    pub sample_rate: u32,
}

impl SynthesizedAudio {
    /// Playback length in whole milliseconds.
    pub fn duration_ms(&self) -> u64 {
        let samples = (self.pcm.len() / 2) as u64;
        samples * 1000 / u64::from(self.sample_rate.max(1))
    }
}

/// Speech synthesis client.
pub struct TtsClient {
    config: TtsConfig,
    http: reqwest::Client,
}

impl TtsClient {
    pub fn new(config: TtsConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Synthesizes `text` into PCM audio.
    ///
    /// # Errors
    /// Returns an error on network failure, a non-success HTTP status, or a
    /// response without audio data.
    pub async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio> {
        let request = build_tts_request(text, &self.config.voice);
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        );

        debug!(model = %self.config.model, voice = %self.config.voice, "sending synthesis request");

        let response = self
            .http
            .post(&url)
            .headers(build_headers(&self.config.api_key))
            .json(&request)
            .send()
            .await
            .context("Speech synthesis request failed")?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            bail!(
                "Speech synthesis error (HTTP {}): {}",
                status.as_u16(),
                error_body_snippet(&body)
            );
        }

        let value: Value = serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse synthesis response JSON: {body}"))?;
        parse_tts_response(&value)
    }
}

fn build_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-goog-api-key",
        HeaderValue::from_str(api_key).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    headers.insert("accept", HeaderValue::from_static("application/json"));
    headers.insert("content-type", HeaderValue::from_static("application/json"));
    headers.insert(
        "user-agent",
        HeaderValue::from_static(super::USER_AGENT),
    );
    headers
}

/// Builds the JSON request body for audio-modality `:generateContent`.
fn build_tts_request(text: &str, voice: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": text }]
        }],
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": {
                    "prebuiltVoiceConfig": { "voiceName": voice }
                }
            }
        }
    })
}

/// Extracts and decodes the audio payload from a synthesis response.
fn parse_tts_response(value: &Value) -> Result<SynthesizedAudio> {
    let Some(inline) = value.pointer("/candidates/0/content/parts/0/inlineData") else {
        bail!("Synthesis response contained no audio data");
    };

    let mime_type = inline
        .get("mimeType")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let data = inline
        .get("data")
        .and_then(Value::as_str)
        .unwrap_or_default();

    if data.is_empty() {
        bail!("Synthesis response contained no audio data");
    }

    let pcm = BASE64
        .decode(data)
        .context("Failed to decode synthesized audio")?;

    Ok(SynthesizedAudio {
        pcm,
        sample_rate: sample_rate_from_mime(mime_type),
    })
}

/// Parses the `rate=` parameter out of a mime type like
/// `audio/L16;codec=pcm;rate=24000`.
fn sample_rate_from_mime(mime_type: &str) -> u32 {
    mime_type
        .split(';')
        .filter_map(|param| param.trim().strip_prefix("rate="))
        .find_map(|rate| rate.parse().ok())
        .unwrap_or(DEFAULT_SAMPLE_RATE)
}
