//! Configuration system for the triage service
//!
//! Loaded from TOML. Secrets are never stored in the file; each section
//! names the environment variable that holds them and they are resolved at
//! startup.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Main service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriageConfig {
    #[serde(default)]
    pub server: ServerSection,
    pub llm: LlmSection,
    #[serde(default)]
    pub triage: TriageSection,
    /// Speech input is optional; audio submissions are rejected without it
    pub speech: Option<SpeechSection>,
}

/// HTTP front end settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum multipart body accepted by `/submit`
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_max_upload_bytes() -> u64 {
    10 * 1024 * 1024
}

/// Model API settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmSection {
    /// Provider name: "moonshot" or "openai" (both OpenAI-compatible)
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Overrides the provider's default API base URL
    pub base_url: Option<String>,
    /// Environment variable containing the API key
    pub api_key_env: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub temperatures: PromptTemperatures,
}

fn default_llm_provider() -> String {
    "moonshot".to_string()
}

fn default_llm_model() -> String {
    "moonshot-v1-8k".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    60
}

/// Sampling temperature for each of the three prompts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PromptTemperatures {
    #[serde(default = "default_completeness_temperature")]
    pub completeness: f32,
    #[serde(default = "default_generation_temperature")]
    pub question: f32,
    #[serde(default = "default_generation_temperature")]
    pub record: f32,
}

impl Default for PromptTemperatures {
    fn default() -> Self {
        Self {
            completeness: default_completeness_temperature(),
            question: default_generation_temperature(),
            record: default_generation_temperature(),
        }
    }
}

fn default_completeness_temperature() -> f32 {
    0.1
}

fn default_generation_temperature() -> f32 {
    0.3
}

/// Consultation flow settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriageSection {
    /// Messages (system prompt included) required before a record may be written
    #[serde(default = "default_min_messages")]
    pub min_messages: usize,
    /// Replaces the built-in triage persona prompt
    pub system_prompt: Option<String>,
}

impl Default for TriageSection {
    fn default() -> Self {
        Self {
            min_messages: default_min_messages(),
            system_prompt: None,
        }
    }
}

fn default_min_messages() -> usize {
    10
}

/// Speech-to-text settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpeechSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_speech_provider")]
    pub provider: SpeechProviderKind,
    /// Environment variable containing the STT API key
    pub api_key_env: String,
    pub base_url: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    /// Model name for whisper-style backends
    pub model: Option<String>,
    /// Sample rate assumed for raw (headerless) PCM uploads
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_speech_timeout_secs")]
    pub timeout_secs: u64,
}

/// Supported speech backends
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpeechProviderKind {
    Google,
    Whisper,
}

fn default_speech_provider() -> SpeechProviderKind {
    SpeechProviderKind::Google
}

fn default_true() -> bool {
    true
}

fn default_language() -> String {
    "zh-CN".to_string()
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_speech_timeout_secs() -> u64 {
    30
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("No configuration file found (tried {0}); pass one with -c/--config")]
    NotFound(String),
}

impl TriageConfig {
    /// Load and validate configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: TriageConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidConfig(
                "server.port must be non-zero".to_string(),
            ));
        }

        match self.llm.provider.as_str() {
            "moonshot" | "openai" => {}
            other => {
                return Err(ConfigError::InvalidConfig(format!(
                    "Unsupported LLM provider: {other}"
                )))
            }
        }

        if let Some(base_url) = &self.llm.base_url {
            validate_url("llm.base_url", base_url)?;
        }

        let temps = &self.llm.temperatures;
        for (name, value) in [
            ("completeness", temps.completeness),
            ("question", temps.question),
            ("record", temps.record),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(ConfigError::InvalidConfig(format!(
                    "llm.temperatures.{name} must be between 0.0 and 2.0, got {value}"
                )));
            }
        }

        if self.triage.min_messages < 2 {
            return Err(ConfigError::InvalidConfig(
                "triage.min_messages must be at least 2".to_string(),
            ));
        }

        if let Some(speech) = &self.speech {
            if let Some(base_url) = &speech.base_url {
                validate_url("speech.base_url", base_url)?;
            }
            if speech.provider == SpeechProviderKind::Whisper
                && speech.enabled
                && speech.base_url.is_none()
            {
                return Err(ConfigError::InvalidConfig(
                    "whisper speech provider requires speech.base_url".to_string(),
                ));
            }
            if speech.sample_rate == 0 {
                return Err(ConfigError::InvalidConfig(
                    "speech.sample_rate must be non-zero".to_string(),
                ));
            }
        }

        Ok(())
    }

    fn get_env_var_required(env_var_name: &str) -> Result<String, ConfigError> {
        std::env::var(env_var_name)
            .map_err(|_| ConfigError::EnvVarNotFound(env_var_name.to_string()))
    }

    /// Get the model API key from its environment variable
    pub fn get_llm_api_key(&self) -> Result<String, ConfigError> {
        Self::get_env_var_required(&self.llm.api_key_env)
    }

    /// Get the speech API key, if speech is configured and enabled
    pub fn get_speech_api_key(&self) -> Result<Option<String>, ConfigError> {
        match self.enabled_speech() {
            Some(speech) => Self::get_env_var_required(&speech.api_key_env).map(Some),
            None => Ok(None),
        }
    }

    /// Speech section when present and switched on
    pub fn enabled_speech(&self) -> Option<&SpeechSection> {
        self.speech.as_ref().filter(|speech| speech.enabled)
    }

    /// Create a test configuration for unit testing
    #[cfg(test)]
    pub fn test_config() -> Self {
        let toml_content = r#"
[llm]
api_key_env = "MOONSHOT_API_KEY"
"#;
        toml::from_str(toml_content).expect("Test config should parse")
    }
}

fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(value)
        .map_err(|e| ConfigError::InvalidConfig(format!("{field} is not a valid URL: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigError::InvalidConfig(format!(
            "{field} must use http or https, got {scheme}"
        ))),
    }
}
