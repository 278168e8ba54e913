//! API clients for the Gemini Generative Language API.
//!
//! Two capabilities live here: text generation with optional search
//! grounding ([`gemini`]) and speech synthesis ([`tts`]). Both speak to the
//! same endpoint family and share key/base-URL resolution.

pub mod gemini;
pub mod tts;

use anyhow::{Context, Result};

pub(crate) const USER_AGENT: &str = concat!("rankchat/", env!("CARGO_PKG_VERSION"));

/// Maximum error-body bytes echoed into error messages.
const ERROR_BODY_LIMIT: usize = 500;

/// Resolves an API key with precedence: config value > environment variable.
pub(crate) fn resolve_api_key(
    config_api_key: Option<&str>,
    env_var: &str,
    config_section: &str,
) -> Result<String> {
    if let Some(key) = config_api_key {
        let trimmed = key.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }

    std::env::var(env_var).context(format!(
        "No API key available. Set {env_var} or api_key in [providers.{config_section}]."
    ))
}

/// Resolves a base URL with precedence: env > config > default.
pub(crate) fn resolve_base_url(
    config_base_url: Option<&str>,
    env_var: &str,
    default_url: &str,
    provider_name: &str,
) -> Result<String> {
    if let Ok(env_url) = std::env::var(env_var) {
        let trimmed = env_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed, provider_name)?;
            return Ok(trimmed.to_string());
        }
    }

    if let Some(config_url) = config_base_url {
        let trimmed = config_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed, provider_name)?;
            return Ok(trimmed.to_string());
        }
    }

    Ok(default_url.to_string())
}

fn validate_url(url: &str, provider_name: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid {provider_name} base URL: {url}"))?;
    Ok(())
}

/// Trims an HTTP error body to a displayable snippet.
pub(crate) fn error_body_snippet(body: &str) -> &str {
    let trimmed = body.trim();
    if trimmed.len() <= ERROR_BODY_LIMIT {
        return trimmed;
    }
    let mut end = ERROR_BODY_LIMIT;
    while end > 0 && !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    &trimmed[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_api_key_prefers_config() {
        let key = resolve_api_key(Some("  config-key  "), "RANKCHAT_TEST_NO_SUCH_VAR", "gemini")
            .unwrap();
        assert_eq!(key, "config-key");
    }

    #[test]
    fn test_resolve_api_key_missing_errors() {
        let err = resolve_api_key(Some("   "), "RANKCHAT_TEST_NO_SUCH_VAR", "gemini")
            .unwrap_err()
            .to_string();
        assert!(err.contains("RANKCHAT_TEST_NO_SUCH_VAR"));
        assert!(err.contains("[providers.gemini]"));
    }

    #[test]
    fn test_resolve_base_url_falls_back_to_default() {
        let url = resolve_base_url(
            None,
            "RANKCHAT_TEST_NO_SUCH_VAR",
            "https://default.example",
            "Gemini",
        )
        .unwrap();
        assert_eq!(url, "https://default.example");
    }

    #[test]
    fn test_resolve_base_url_rejects_invalid_config_value() {
        let result = resolve_base_url(
            Some("not a url"),
            "RANKCHAT_TEST_NO_SUCH_VAR",
            "https://default.example",
            "Gemini",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_error_body_snippet_truncates() {
        let long = "x".repeat(2000);
        assert_eq!(error_body_snippet(&long).len(), 500);
        assert_eq!(error_body_snippet("  short  "), "short");
    }
}
