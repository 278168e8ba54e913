//! Configuration management for RankChat.
//!
//! Loads configuration from ${RANKCHAT_HOME}/config.toml with sensible
//! defaults.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::message::ResponseMode;

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
/// To update, edit default_config.toml directly.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Merges user config values into the default template.
///
/// This ensures new comments/sections from the template are always present,
/// while preserving user's customized values.
fn merge_with_template(user_config: &str) -> Result<String> {
    use toml_edit::DocumentMut;

    let mut doc: DocumentMut = default_config_template()
        .parse()
        .context("Failed to parse default config template")?;

    let user_doc: DocumentMut = user_config.parse().context("Failed to parse user config")?;

    merge_items(doc.as_table_mut(), user_doc.as_table());

    Ok(doc.to_string())
}

/// Recursively merges items from source table into target table.
fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source.iter() {
        match value {
            Item::Value(v) => {
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

pub mod paths {
    //! Path resolution for RankChat configuration and data directories.
    //!
    //! RANKCHAT_HOME resolution order:
    //! 1. RANKCHAT_HOME environment variable (if set)
    //! 2. ~/.config/rankchat (default)

    use std::path::PathBuf;

    /// Returns the RankChat home directory.
    ///
    /// Checks RANKCHAT_HOME env var first, falls back to ~/.config/rankchat
    pub fn rankchat_home() -> PathBuf {
        if let Ok(home) = std::env::var("RANKCHAT_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("rankchat"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        rankchat_home().join("config.toml")
    }

    /// Returns the path to the sessions directory.
    pub fn sessions_dir() -> PathBuf {
        rankchat_home().join("sessions")
    }

    /// Returns the path to the app state file (pins, usage stats).
    pub fn state_path() -> PathBuf {
        rankchat_home().join("state.json")
    }

    /// Returns the path to the exported-reports directory.
    pub fn exports_dir() -> PathBuf {
        rankchat_home().join("exports")
    }

    /// Returns the path to the log directory.
    pub fn logs_dir() -> PathBuf {
        rankchat_home().join("logs")
    }
}

/// Gemini provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProviderConfig {
    /// Optional API key (overrides environment variable).
    pub api_key: Option<String>,
    /// Optional API base URL (for proxies).
    pub base_url: Option<String>,
}

impl ProviderConfig {
    /// Returns the effective API key if set and non-empty.
    pub fn effective_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Returns the effective base URL if set and non-empty.
    pub fn effective_base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Provider table in the config file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    pub gemini: ProviderConfig,
}

/// Speech synthesis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Model used for speech synthesis.
    pub model: String,
    /// Prebuilt voice name.
    pub voice: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            model: Config::DEFAULT_TTS_MODEL.to_string(),
            voice: Config::DEFAULT_VOICE.to_string(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gemini model used for chat responses
    pub model: String,

    /// Response style (short or detailed)
    pub response_mode: ResponseMode,

    /// Augment answers with Google Search grounding
    pub grounding: bool,

    /// Reveal answers with a typing animation in the TUI
    pub typing_animation: bool,

    /// Cap on response tokens (API default when unset)
    pub max_output_tokens: Option<u32>,

    /// Optional inline system prompt
    pub system_prompt: Option<String>,

    /// Optional path to a file containing the system prompt
    pub system_prompt_file: Option<String>,

    /// Provider configuration (API keys, base URLs).
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Speech synthesis configuration.
    #[serde(default)]
    pub tts: TtsConfig,
}

impl Config {
    const DEFAULT_MODEL: &str = "gemini-2.5-flash";
    const DEFAULT_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";
    const DEFAULT_VOICE: &str = "Kore";

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Saves only the model field to the config file.
    pub fn save_model(model: &str) -> Result<()> {
        Self::save_model_to(&paths::config_path(), model)
    }

    /// Saves only the model field to a specific config file path.
    ///
    /// Creates the file with default template if it doesn't exist.
    /// If file exists, merges user values into the latest template.
    pub fn save_model_to(path: &Path, model: &str) -> Result<()> {
        Self::save_field_to(path, |doc| {
            doc["model"] = toml_edit::value(model);
        })
    }

    /// Saves only the response_mode field to the config file.
    pub fn save_response_mode(mode: ResponseMode) -> Result<()> {
        Self::save_response_mode_to(&paths::config_path(), mode)
    }

    /// Saves only the response_mode field to a specific config file path.
    pub fn save_response_mode_to(path: &Path, mode: ResponseMode) -> Result<()> {
        Self::save_field_to(path, |doc| {
            doc["response_mode"] = toml_edit::value(mode.display_name());
        })
    }

    /// Merges the existing file into the template, applies `update`, and
    /// writes the result back atomically.
    fn save_field_to(path: &Path, update: impl FnOnce(&mut toml_edit::DocumentMut)) -> Result<()> {
        use toml_edit::DocumentMut;

        let contents = if path.exists() {
            let user_config = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            merge_with_template(&user_config)?
        } else {
            default_config_template().to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        update(&mut doc);

        Self::write_config(path, &doc.to_string())
    }

    /// Returns the effective system prompt, preferring the file if both are set.
    pub fn effective_system_prompt(&self) -> Result<Option<String>> {
        if let Some(path_str) = &self.system_prompt_file {
            let path = Path::new(path_str);
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read system prompt file: {path_str}"))?;
            let trimmed = content.trim();
            return Ok((!trimmed.is_empty()).then(|| trimmed.to_string()));
        }

        let trimmed = self.system_prompt.as_deref().unwrap_or("").trim();
        Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: Self::DEFAULT_MODEL.to_string(),
            response_mode: ResponseMode::default(),
            grounding: true,
            typing_animation: true,
            max_output_tokens: None,
            system_prompt: None,
            system_prompt_file: None,
            providers: ProvidersConfig::default(),
            tts: TtsConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert!(config.grounding);
        assert!(config.typing_animation);
        assert_eq!(config.response_mode, ResponseMode::Detailed);
    }

    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "model = \"gemini-2.5-pro\"\n").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.model, "gemini-2.5-pro");
        assert!(config.grounding);
        assert_eq!(config.tts.voice, "Kore");
    }

    #[test]
    fn test_init_creates_config_with_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();

        assert!(config_path.exists());
        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("gemini-2.5-flash"));
        assert!(contents.contains("# RankChat Configuration"));
    }

    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "").unwrap();

        assert!(Config::init(&config_path).is_err());
    }

    #[test]
    fn test_system_prompt_file_wins_over_inline() {
        let dir = tempdir().unwrap();
        let prompt_file = dir.path().join("prompt.txt");
        fs::write(&prompt_file, "file prompt").unwrap();

        let config = Config {
            system_prompt_file: Some(prompt_file.to_str().unwrap().to_string()),
            system_prompt: Some("inline prompt".to_string()),
            ..Default::default()
        };

        assert_eq!(
            config.effective_system_prompt().unwrap(),
            Some("file prompt".to_string())
        );
    }

    #[test]
    fn test_save_model_creates_file_with_template() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        Config::save_model_to(&config_path, "gemini-2.5-pro").unwrap();

        assert!(config_path.exists());

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.model, "gemini-2.5-pro");

        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("# RankChat Configuration"));
        assert!(contents.contains("# Response style"));
    }

    #[test]
    fn test_save_model_preserves_other_fields() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(
            &config_path,
            "model = \"old-model\"\ngrounding = false\ntyping_animation = false\n",
        )
        .unwrap();

        Config::save_model_to(&config_path, "new-model").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.model, "new-model");
        assert!(!config.grounding);
        assert!(!config.typing_animation);
    }

    #[test]
    fn test_save_response_mode_roundtrip() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "model = \"test-model\"\n").unwrap();

        Config::save_response_mode_to(&config_path, ResponseMode::Short).unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.response_mode, ResponseMode::Short);
        assert_eq!(config.model, "test-model");

        Config::save_response_mode_to(&config_path, ResponseMode::Detailed).unwrap();
        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.response_mode, ResponseMode::Detailed);
    }

    #[test]
    fn test_gemini_base_url_loaded_from_config() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(
            &config_path,
            "[providers.gemini]\nbase_url = \"https://my-proxy.example.com\"\n",
        )
        .unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(
            config.providers.gemini.effective_base_url(),
            Some("https://my-proxy.example.com")
        );
    }

    #[test]
    fn test_gemini_base_url_empty_is_none() {
        let config = Config {
            providers: ProvidersConfig {
                gemini: ProviderConfig {
                    base_url: Some("   ".to_string()),
                    ..Default::default()
                },
            },
            ..Default::default()
        };
        assert_eq!(config.providers.gemini.effective_base_url(), None);
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nested").join("dir").join("config.toml");

        Config::save_model_to(&config_path, "gemini-2.5-flash").unwrap();

        assert!(config_path.exists());
    }
}
