//! Application configuration for SheetPrompt.
//!
//! User config lives at `~/.sheetprompt/sheetprompt.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, SheetPromptError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "sheetprompt.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".sheetprompt";

// ---------------------------------------------------------------------------
// Config structs (matching sheetprompt.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Conversation defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Workbook sheet names.
    #[serde(default)]
    pub sheets: SheetNames,

    /// Model endpoint settings.
    #[serde(default)]
    pub model: ModelConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory holding `<session>.json` and `<session>.jsonl` files.
    #[serde(default = "default_sessions_dir")]
    pub sessions_dir: String,

    /// Number of user/assistant pairs kept in context besides the system message.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Invoke the rolling-summary hook before trimming.
    #[serde(default)]
    pub rolling_summary: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            sessions_dir: default_sessions_dir(),
            max_turns: default_max_turns(),
            rolling_summary: false,
        }
    }
}

fn default_sessions_dir() -> String {
    "var/sessions".into()
}
fn default_max_turns() -> usize {
    20
}

/// `[sheets]` section: which workbook sheet feeds which block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetNames {
    #[serde(default = "default_documentation_sheet")]
    pub documentation: String,

    #[serde(default = "default_definitions_sheet")]
    pub definitions: String,

    #[serde(default = "default_mapping_sheet")]
    pub mapping: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            documentation: default_documentation_sheet(),
            definitions: default_definitions_sheet(),
            mapping: default_mapping_sheet(),
        }
    }
}

fn default_documentation_sheet() -> String {
    "Documentation".into()
}
fn default_definitions_sheet() -> String {
    "TypeDefinitions.d.ts".into()
}
fn default_mapping_sheet() -> String {
    "AUS mapping v14.6".into()
}

/// `[model]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// OpenAI-compatible API root, e.g. `https://api.openai.com/v1`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            temperature: None,
            max_tokens: None,
        }
    }
}

impl ModelConfig {
    /// Parse and validate `base_url`.
    pub fn endpoint(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            SheetPromptError::config(format!("invalid model base_url '{}': {e}", self.base_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SheetPromptError::config(format!(
                "model base_url must be http(s): {url}"
            )));
        }
        Ok(url)
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_api_key_env() -> String {
    "SHEETPROMPT_API_KEY".into()
}
fn default_timeout_secs() -> u64 {
    120
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.sheetprompt/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SheetPromptError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.sheetprompt/sheetprompt.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SheetPromptError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        SheetPromptError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SheetPromptError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SheetPromptError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SheetPromptError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the model API key from the env var named in the config.
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.model.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(SheetPromptError::config(format!(
            "model API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("sessions_dir"));
        assert!(toml_str.contains("SHEETPROMPT_API_KEY"));
        assert!(toml_str.contains("TypeDefinitions.d.ts"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.max_turns, 20);
        assert!(!parsed.defaults.rolling_summary);
        assert_eq!(parsed.sheets, SheetNames::default());
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let toml_str = r#"
[defaults]
max_turns = 4

[sheets]
mapping = "Paths"

[model]
model = "local-llm"
temperature = 0.1
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.max_turns, 4);
        assert_eq!(config.defaults.sessions_dir, "var/sessions");
        assert_eq!(config.sheets.mapping, "Paths");
        assert_eq!(config.sheets.documentation, "Documentation");
        assert_eq!(config.model.model, "local-llm");
        assert_eq!(config.model.temperature, Some(0.1));
        assert_eq!(config.model.timeout_secs, 120);
    }

    #[test]
    fn endpoint_validation() {
        let mut model = ModelConfig::default();
        assert!(model.endpoint().is_ok());

        model.base_url = "ftp://example.com".into();
        assert!(model.endpoint().is_err());

        model.base_url = "not a url".into();
        assert!(model.endpoint().is_err());
    }

    #[test]
    fn api_key_resolution() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.model.api_key_env = "SP_TEST_NONEXISTENT_KEY_12345".into();
        let result = resolve_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
