//! Gemini text generation (Generative Language API).

use anyhow::{Context, Result, bail};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{Value, json};
use tracing::debug;

use super::{error_body_snippet, resolve_api_key, resolve_base_url};
use crate::message::{ChatMessage, ResponseMode, Role, Source, dedupe_sources};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Base persona prompt for every chat request.
const SEO_ASSISTANT_PROMPT: &str = "\
You are the Rabbit Rank SEO assistant. You help users with search engine \
optimization: keyword research, on-page optimization, technical SEO, link \
building, and content strategy. When you show your reasoning, put it under a \
bold **Reasoning:** label followed by a bold **Answer:** label for the final \
answer. End responses with a short promotional footer starting with \
\"💡 **Need Professional SEO Help?**\" that points readers to Rabbit Rank \
(rabbitrank.com).";

/// Gemini API configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl GeminiConfig {
    /// Creates a new config from the config file and environment.
    ///
    /// Authentication resolution order:
    /// 1. `config_api_key` parameter (from config file)
    /// 2. `GEMINI_API_KEY` environment variable
    ///
    /// Base URL resolution order: `GEMINI_BASE_URL` env var, config file,
    /// then the public endpoint.
    pub fn from_env(
        model: String,
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
        })
    }
}

/// A file attached to a prompt.
///
/// Attachments ride along with the request but never alter section
/// extraction on the response side.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    /// Base64-encoded content.
    pub data: String,
    /// Whether the content is sent inline with the request.
    pub inline: bool,
}

/// One generation exchange's worth of request options.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Extra system prompt appended to the persona prompt.
    pub system_prompt: Option<String>,
    /// Augment the answer with Google Search grounding.
    pub grounding: bool,
    /// Answer verbosity.
    pub mode: ResponseMode,
    /// Cap on response tokens; the API default applies when unset.
    pub max_output_tokens: Option<u32>,
    /// Files attached to the final user turn.
    pub attachments: Vec<Attachment>,
}

/// Parsed generation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateReply {
    pub text: String,
    pub sources: Vec<Source>,
    pub prompt_tokens: u64,
    pub response_tokens: u64,
}

/// Gemini client.
pub struct GeminiClient {
    config: GeminiConfig,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Sends the conversation and returns the model's reply.
    ///
    /// # Errors
    /// Returns an error on network failure, a non-success HTTP status, or a
    /// response with no usable candidate.
    pub async fn generate(
        &self,
        history: &[ChatMessage],
        options: &GenerateOptions,
    ) -> Result<GenerateReply> {
        let request = build_generate_request(history, options);
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        );

        debug!(model = %self.config.model, grounding = options.grounding, "sending generate request");

        let response = self
            .http
            .post(&url)
            .headers(build_headers(&self.config.api_key))
            .json(&request)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            bail!(
                "Gemini API error (HTTP {}): {}",
                status.as_u16(),
                error_body_snippet(&body)
            );
        }

        let value: Value = serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse Gemini response JSON: {body}"))?;
        parse_generate_response(&value)
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

/// Builds the system instruction from the persona prompt, the configured
/// extra prompt, and the verbosity mode.
fn build_system_instruction(options: &GenerateOptions) -> String {
    let mut prompt = SEO_ASSISTANT_PROMPT.to_string();

    match options.mode {
        ResponseMode::Short => {
            prompt.push_str("\n\nKeep answers brief: a few sentences or a short list.");
        }
        ResponseMode::Detailed => {
            prompt.push_str("\n\nGive thorough answers with concrete steps and examples.");
        }
    }

    if let Some(extra) = options.system_prompt.as_deref() {
        let extra = extra.trim();
        if !extra.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(extra);
        }
    }

    prompt
}

/// Builds the JSON request body for `:generateContent`.
fn build_generate_request(history: &[ChatMessage], options: &GenerateOptions) -> Value {
    let mut contents: Vec<Value> = history
        .iter()
        .map(|message| {
            let role = match message.role {
                Role::User => "user",
                Role::Assistant => "model",
            };
            json!({
                "role": role,
                "parts": [{ "text": message.text }]
            })
        })
        .collect();

    // Attachments ride on the final user turn.
    if !options.attachments.is_empty()
        && let Some(last) = contents.last_mut()
        && last["role"] == "user"
        && let Some(parts) = last["parts"].as_array_mut()
    {
        for attachment in &options.attachments {
            if attachment.inline {
                parts.push(json!({
                    "inlineData": {
                        "mimeType": attachment.mime_type,
                        "data": attachment.data,
                    }
                }));
            } else {
                parts.push(json!({
                    "text": format!("[Attached file: {} ({})]", attachment.name, attachment.mime_type)
                }));
            }
        }
    }

    let mut request = json!({
        "contents": contents,
        "systemInstruction": {
            "parts": [{ "text": build_system_instruction(options) }]
        },
    });

    if options.grounding {
        request["tools"] = json!([{ "googleSearch": {} }]);
    }

    if let Some(max) = options.max_output_tokens {
        request["generationConfig"] = json!({ "maxOutputTokens": max });
    }

    request
}

/// Parses a `:generateContent` response into a reply.
fn parse_generate_response(value: &Value) -> Result<GenerateReply> {
    if let Some(reason) = value
        .pointer("/promptFeedback/blockReason")
        .and_then(Value::as_str)
    {
        bail!("Gemini blocked the prompt: {reason}");
    }

    let Some(candidate) = value.pointer("/candidates/0") else {
        bail!("Gemini returned no candidates");
    };

    let parts = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut text = String::new();
    for part in &parts {
        if let Some(fragment) = part.get("text").and_then(Value::as_str) {
            text.push_str(fragment);
        }
    }

    if text.trim().is_empty() {
        bail!("Gemini returned an empty response");
    }

    let mut sources = Vec::new();
    if let Some(chunks) = candidate
        .pointer("/groundingMetadata/groundingChunks")
        .and_then(Value::as_array)
    {
        for chunk in chunks {
            let Some(web) = chunk.get("web") else { continue };
            let uri = web.get("uri").and_then(Value::as_str).unwrap_or_default();
            if uri.is_empty() {
                continue;
            }
            let title = web
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or(uri)
                .to_string();
            sources.push(Source {
                title,
                uri: uri.to_string(),
            });
        }
    }

    let prompt_tokens = value
        .pointer("/usageMetadata/promptTokenCount")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let response_tokens = value
        .pointer("/usageMetadata/candidatesTokenCount")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    Ok(GenerateReply {
        text,
        sources: dedupe_sources(sources),
        prompt_tokens,
        response_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(text: &str) -> ChatMessage {
        ChatMessage::user(text)
    }

    #[test]
    fn test_request_maps_roles_and_history_order() {
        let history = vec![
            user("how do I improve CTR?"),
            ChatMessage::assistant("Rewrite your title tags.", Vec::new(), Default::default()),
            user("what about meta descriptions?"),
        ];
        let request = build_generate_request(&history, &GenerateOptions::default());

        let contents = request["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(
            contents[2]["parts"][0]["text"],
            "what about meta descriptions?"
        );
    }

    #[test]
    fn test_request_includes_search_tool_only_when_grounded() {
        let history = vec![user("latest algorithm update?")];

        let grounded = build_generate_request(
            &history,
            &GenerateOptions {
                grounding: true,
                ..Default::default()
            },
        );
        assert!(grounded["tools"][0].get("googleSearch").is_some());

        let capped = build_generate_request(
            &history,
            &GenerateOptions {
                max_output_tokens: Some(512),
                ..Default::default()
            },
        );
        assert_eq!(capped["generationConfig"]["maxOutputTokens"], 512);

        let plain = build_generate_request(&history, &GenerateOptions::default());
        assert!(plain.get("tools").is_none());
    }

    #[test]
    fn test_request_system_instruction_reflects_mode() {
        let history = vec![user("hi")];
        let request = build_generate_request(
            &history,
            &GenerateOptions {
                mode: ResponseMode::Short,
                system_prompt: Some("Focus on e-commerce.".to_string()),
                ..Default::default()
            },
        );

        let instruction = request["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap();
        assert!(instruction.contains("Rabbit Rank"));
        assert!(instruction.contains("Keep answers brief"));
        assert!(instruction.contains("Focus on e-commerce."));
    }

    #[test]
    fn test_request_inline_attachment_added_to_last_user_turn() {
        let history = vec![user("audit this file")];
        let request = build_generate_request(
            &history,
            &GenerateOptions {
                attachments: vec![Attachment {
                    name: "report.csv".to_string(),
                    mime_type: "text/csv".to_string(),
                    data: "aGVsbG8=".to_string(),
                    inline: true,
                }],
                ..Default::default()
            },
        );

        let parts = request["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1]["inlineData"]["mimeType"], "text/csv");
        assert_eq!(parts[1]["inlineData"]["data"], "aGVsbG8=");
    }

    #[test]
    fn test_parse_response_with_grounding_sources() {
        let value = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "Use long-tail " },
                        { "text": "keywords." }
                    ]
                },
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "title": "Guide", "uri": "https://a.example" } },
                        { "web": { "title": "Duplicate", "uri": "https://a.example" } },
                        { "web": { "uri": "https://b.example" } },
                        { "retrievedContext": {} }
                    ]
                }
            }],
            "usageMetadata": { "promptTokenCount": 42, "candidatesTokenCount": 17 }
        });

        let reply = parse_generate_response(&value).unwrap();
        assert_eq!(reply.text, "Use long-tail keywords.");
        assert_eq!(reply.sources.len(), 2);
        assert_eq!(reply.sources[0].title, "Guide");
        // Missing title falls back to the uri.
        assert_eq!(reply.sources[1].title, "https://b.example");
        assert_eq!(reply.prompt_tokens, 42);
        assert_eq!(reply.response_tokens, 17);
    }

    #[test]
    fn test_parse_response_no_candidates_errors() {
        let value = json!({ "candidates": [] });
        assert!(parse_generate_response(&value).is_err());
    }

    #[test]
    fn test_parse_response_blocked_prompt_errors() {
        let value = json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        });
        let err = parse_generate_response(&value).unwrap_err().to_string();
        assert!(err.contains("SAFETY"));
    }

    #[test]
    fn test_parse_response_empty_text_errors() {
        let value = json!({
            "candidates": [{ "content": { "parts": [{ "text": "  " }] } }]
        });
        assert!(parse_generate_response(&value).is_err());
    }
}
