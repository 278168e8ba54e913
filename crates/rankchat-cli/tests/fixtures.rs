//! Gemini response fixture helpers for integration tests.

#![allow(dead_code)]

use wiremock::ResponseTemplate;

// Load fixture templates at compile time
pub const GENERATE_RESPONSE: &str = include_str!("fixtures/generate_response.json");

/// Create a `:generateContent` response body with the given text.
pub fn generate_json(text: &str) -> String {
    GENERATE_RESPONSE.replace("{{TEXT}}", &escape_json(text))
}

/// Wrap a JSON body string in a ResponseTemplate.
pub fn json_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "application/json")
        .set_body_string(body.to_string())
}

/// Convenience: text reply wrapped in a ResponseTemplate.
pub fn text_response(text: &str) -> ResponseTemplate {
    json_response(&generate_json(text))
}

/// A grounded reply carrying web citations.
pub fn grounded_response(text: &str, sources: &[(&str, &str)]) -> ResponseTemplate {
    let chunks: Vec<serde_json::Value> = sources
        .iter()
        .map(|(title, uri)| serde_json::json!({ "web": { "title": title, "uri": uri } }))
        .collect();
    let body = serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP",
            "groundingMetadata": { "groundingChunks": chunks }
        }],
        "usageMetadata": { "promptTokenCount": 42, "candidatesTokenCount": 17 }
    });
    json_response(&body.to_string())
}

/// Escape special characters for JSON string embedding.
fn escape_json(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_json_substitution() {
        let result = generate_json("Hello, world!");
        assert!(result.contains(r#""text": "Hello, world!""#));
        assert!(result.contains("promptTokenCount"));
    }

    #[test]
    fn test_generate_json_escapes_newlines() {
        let result = generate_json("line one\nline two \"quoted\"");
        assert!(result.contains(r#"line one\nline two \"quoted\""#));
    }
}
