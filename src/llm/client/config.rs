//! Completion client configuration.

use serde::{Deserialize, Serialize};

use super::prompts::DEFAULT_FUSION_PROMPT;

/// LLM provider type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Ollama API (local, default)
    #[default]
    Ollama,
    /// OpenAI-compatible API (OpenAI, Groq, Together.ai, etc.)
    OpenAI,
}

impl LlmProvider {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "openai" | "groq" | "together" => Some(Self::OpenAI),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAI => "openai",
        }
    }
}

/// Configuration for the completion client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Whether fusion may call the completion service
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// LLM provider (ollama or openai)
    #[serde(default)]
    pub provider: LlmProvider,
    /// API endpoint (provider-specific defaults apply)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API key for OpenAI-compatible providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model identifier sent with every completion
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum tokens in response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Temperature for generation (0.0 - 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Custom structuring instruction for fusion
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Maximum characters of each evidence turn sent to the service
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_content_chars() -> usize {
    12000
}

fn default_timeout_secs() -> u64 {
    120
}

const OPENAI_ENDPOINT: &str = "https://api.openai.com";
const OPENAI_MODEL: &str = "gpt-4o";
const GROQ_ENDPOINT: &str = "https://api.groq.com/openai";
const GROQ_MODEL: &str = "llama-3.3-70b-versatile";
const TOGETHER_ENDPOINT: &str = "https://api.together.xyz";

impl Default for LlmConfig {
    fn default() -> Self {
        Self::base_default().with_env_overrides()
    }
}

impl LlmConfig {
    /// Base default without env overrides.
    pub fn base_default() -> Self {
        Self {
            enabled: default_enabled(),
            provider: LlmProvider::default(),
            endpoint: default_endpoint(),
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            system_prompt: None,
            max_content_chars: default_max_content_chars(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `LLM_ENABLED`: "true" or "false"
    /// - `LLM_PROVIDER`: "ollama" (default), "openai", "groq", or "together"
    /// - `LLM_ENDPOINT`: API endpoint (defaults based on provider)
    /// - `LLM_API_KEY`: API key for OpenAI-compatible providers
    /// - `LLM_MODEL`: Model name
    /// - `LLM_MAX_TOKENS`, `LLM_TEMPERATURE`, `LLM_MAX_CONTENT_CHARS`
    /// - `LLM_TIMEOUT_SECS`: Request timeout
    /// - `LLM_SYSTEM_PROMPT`: Custom structuring instruction
    ///
    /// Priority: LLM_PROVIDER wins over auto-detection from API keys.
    /// Without it, `GROQ_API_KEY` or `OPENAI_API_KEY` switches to the
    /// OpenAI-compatible provider. When the model was left at the Ollama
    /// default, the provider's default model is used (`gpt-4o` for OpenAI).
    pub fn with_env_overrides(self) -> Self {
        self.with_env(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_env<F>(mut self, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = var("LLM_ENABLED") {
            self.enabled = val.eq_ignore_ascii_case("true") || val == "1";
        }

        let explicit_provider = var("LLM_PROVIDER").map(|p| p.to_lowercase());
        if let Some(provider) = explicit_provider.as_deref().and_then(LlmProvider::from_str) {
            self.provider = provider;
        }

        let explicit_endpoint = var("LLM_ENDPOINT");
        if let Some(ref endpoint) = explicit_endpoint {
            self.endpoint = endpoint.clone();
        }

        if let Some(val) = var("LLM_API_KEY") {
            self.api_key = Some(val);
        }

        // (endpoint, model) defaults for the provider actually chosen
        let mut provider_defaults: Option<(&str, &str)> = None;

        match explicit_provider.as_deref() {
            Some("groq") => {
                provider_defaults = Some((GROQ_ENDPOINT, GROQ_MODEL));
                if self.api_key.is_none() {
                    self.api_key = var("GROQ_API_KEY");
                }
            }
            Some("openai") => {
                provider_defaults = Some((OPENAI_ENDPOINT, OPENAI_MODEL));
                if self.api_key.is_none() {
                    self.api_key = var("OPENAI_API_KEY");
                }
            }
            Some("together") => {
                provider_defaults = Some((TOGETHER_ENDPOINT, OPENAI_MODEL));
            }
            Some(_) => {}
            None => {
                if self.api_key.is_none() {
                    if let Some(key) = var("GROQ_API_KEY") {
                        self.api_key = Some(key);
                        self.provider = LlmProvider::OpenAI;
                        provider_defaults = Some((GROQ_ENDPOINT, GROQ_MODEL));
                    } else if let Some(key) = var("OPENAI_API_KEY") {
                        self.api_key = Some(key);
                        self.provider = LlmProvider::OpenAI;
                        provider_defaults = Some((OPENAI_ENDPOINT, OPENAI_MODEL));
                    }
                }
            }
        }

        if let Some((endpoint, model)) = provider_defaults {
            if explicit_endpoint.is_none() && self.endpoint == default_endpoint() {
                self.endpoint = endpoint.to_string();
            }
            if self.model == default_model() {
                self.model = model.to_string();
            }
        }

        if let Some(val) = var("LLM_MODEL") {
            self.model = val;
        }
        if let Some(n) = var("LLM_MAX_TOKENS").and_then(|v| v.parse().ok()) {
            self.max_tokens = n;
        }
        if let Some(t) = var("LLM_TEMPERATURE").and_then(|v| v.parse().ok()) {
            self.temperature = t;
        }
        if let Some(n) = var("LLM_MAX_CONTENT_CHARS").and_then(|v| v.parse().ok()) {
            self.max_content_chars = n;
        }
        if let Some(n) = var("LLM_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.timeout_secs = n;
        }
        if let Some(val) = var("LLM_SYSTEM_PROMPT") {
            self.system_prompt = Some(val);
        }
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Get the fusion instruction, using custom or default.
    pub fn get_system_prompt(&self) -> &str {
        self.system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_FUSION_PROMPT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_base_default_is_local_ollama() {
        let config = LlmConfig::base_default().with_env(env(&[]));
        assert_eq!(config.provider, LlmProvider::Ollama);
        assert_eq!(config.endpoint, "http://localhost:11434");
        assert!(config.get_system_prompt().contains("**Fiche Technique**"));
    }

    #[test]
    fn test_openai_key_selects_gpt4o() {
        let config = LlmConfig::base_default().with_env(env(&[("OPENAI_API_KEY", "sk-test")]));
        assert_eq!(config.provider, LlmProvider::OpenAI);
        assert_eq!(config.endpoint, "https://api.openai.com");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_explicit_provider_wins_over_detection() {
        let config = LlmConfig::base_default().with_env(env(&[
            ("LLM_PROVIDER", "openai"),
            ("GROQ_API_KEY", "gsk"),
            ("OPENAI_API_KEY", "sk"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("sk"));
        assert_eq!(config.endpoint, "https://api.openai.com");
    }

    #[test]
    fn test_explicit_model_and_endpoint_kept() {
        let config = LlmConfig::base_default().with_env(env(&[
            ("OPENAI_API_KEY", "sk"),
            ("LLM_MODEL", "gpt-4o-mini"),
            ("LLM_ENDPOINT", "http://proxy:8080"),
        ]));
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.endpoint, "http://proxy:8080");
    }

    #[test]
    fn test_disable_and_custom_prompt() {
        let config = LlmConfig::base_default().with_env(env(&[
            ("LLM_ENABLED", "false"),
            ("LLM_SYSTEM_PROMPT", "Décris le produit."),
        ]));
        assert!(!config.enabled);
        assert_eq!(config.get_system_prompt(), "Décris le produit.");
    }
}
