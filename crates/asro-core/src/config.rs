use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::AsroError;

/// Top-level Asro configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub persona: PersonaConfig,
}

/// General bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Gemini API provider config.
///
/// The API key may also come from the `GEMINI_API_KEY` environment
/// variable, which takes precedence over the file value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_gemini_model(),
        }
    }
}

/// WhatsApp channel config.
///
/// Session data is stored at `{data_dir}/whatsapp_session/`.
/// Pairing is done by scanning a QR code (like WhatsApp Web).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Allowed phone numbers (e.g. `["5511999887766"]`). Empty = allow all.
    #[serde(default)]
    pub allowed_users: Vec<String>,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_users: Vec::new(),
        }
    }
}

/// The two literal toggle commands.
///
/// Matching is exact and case-insensitive against the full message text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    #[serde(default = "default_disable_command")]
    pub disable: String,
    #[serde(default = "default_enable_command")]
    pub enable: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            disable: default_disable_command(),
            enable: default_enable_command(),
        }
    }
}

/// Names interpolated into the persona prompt and confirmation replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,
    #[serde(default = "default_owner_name")]
    pub owner_name: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            assistant_name: default_assistant_name(),
            owner_name: default_owner_name(),
        }
    }
}

// --- Default value functions ---

fn default_name() -> String {
    "Asro".to_string()
}
fn default_data_dir() -> String {
    "~/.asro".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_true() -> bool {
    true
}
fn default_disable_command() -> String {
    "stopai".to_string()
}
fn default_enable_command() -> String {
    "onai".to_string()
}
fn default_assistant_name() -> String {
    "Asro".to_string()
}
fn default_owner_name() -> String {
    "Abdul Rojak".to_string()
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist. The
/// `GEMINI_API_KEY` environment variable overrides the file value.
pub fn load(path: &str) -> Result<Config, AsroError> {
    let path = Path::new(path);
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AsroError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| AsroError::Config(format!("failed to parse config: {}", e)))?
    } else {
        tracing::info!("Config file not found at {}, using defaults", path.display());
        Config::default()
    };

    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        if !key.is_empty() {
            config.gemini.api_key = key;
        }
    }

    Ok(config)
}

impl Config {
    /// Check required fields. Startup must fail loudly if the API key is
    /// missing rather than running in a broken state.
    pub fn validate(&self) -> Result<(), AsroError> {
        if self.gemini.api_key.is_empty() {
            return Err(AsroError::Config(
                "gemini.api_key is not set (config file or GEMINI_API_KEY env var)".into(),
            ));
        }
        if self.commands.disable.is_empty() || self.commands.enable.is_empty() {
            return Err(AsroError::Config(
                "commands.disable and commands.enable must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bot.name, "Asro");
        assert_eq!(config.commands.disable, "stopai");
        assert_eq!(config.commands.enable, "onai");
        assert_eq!(config.persona.assistant_name, "Asro");
        assert!(config.whatsapp.enabled);
        assert!(config.whatsapp.allowed_users.is_empty());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [gemini]
            api_key = "AIza-test"
            model = "gemini-2.0-flash"

            [commands]
            disable = "/ai off"
            enable = "/ai on"

            [persona]
            assistant_name = "Asro"
            owner_name = "Abdul Rojak"

            [whatsapp]
            allowed_users = ["5511999887766"]
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.gemini.api_key, "AIza-test");
        assert_eq!(config.commands.disable, "/ai off");
        assert_eq!(config.commands.enable, "/ai on");
        assert_eq!(config.whatsapp.allowed_users, vec!["5511999887766"]);
        // Sections not present fall back to defaults.
        assert_eq!(config.bot.log_level, "info");
    }

    #[test]
    fn test_validate_missing_api_key() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("api_key"));
    }

    #[test]
    fn test_validate_empty_command() {
        let mut config = Config::default();
        config.gemini.api_key = "AIza-test".into();
        config.commands.enable = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ok() {
        let mut config = Config::default();
        config.gemini.api_key = "AIza-test".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shellexpand() {
        std::env::set_var("HOME", "/home/test");
        assert_eq!(shellexpand("~/data"), "/home/test/data");
        assert_eq!(shellexpand("/absolute/path"), "/absolute/path");
    }
}
