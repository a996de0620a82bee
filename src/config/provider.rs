//! Provider Configuration
//!
//! Defines the configuration schema for chat providers and client settings.

use crate::api::sse::DEFAULT_MAX_CONSECUTIVE_MALFORMED;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Provider configurations keyed by provider id
    pub providers: HashMap<String, ProviderConfig>,

    /// Transport and decoding settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientSettings>,
}

/// Wire protocol spoken by a provider
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApiFormat {
    /// `POST {base}/chat/completions` with Bearer auth
    #[default]
    Openai,

    /// `POST {base}/v1beta/models/{model}:streamGenerateContent` with `x-goog-api-key`
    Google,
}

/// Provider ids that speak the Google AI protocol when no format is declared
const GOOGLE_PROVIDER_IDS: &[&str] = &["google", "gemini", "google-ai", "googleai"];

impl ApiFormat {
    /// Format implied by a provider id; anything unrecognised is OpenAI-compatible
    pub fn for_provider_id(provider_id: &str) -> Self {
        let id = provider_id.to_ascii_lowercase();
        if GOOGLE_PROVIDER_IDS.contains(&id.as_str()) {
            ApiFormat::Google
        } else {
            ApiFormat::Openai
        }
    }
}

/// Configuration for a single chat provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL for the API
    pub base_url: String,

    /// Environment variable name for the API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Optional environment variable for custom base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base_env: Option<String>,

    /// Wire protocol; `None` infers it from the provider id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_format: Option<ApiFormat>,

    /// Models served by this provider (exact names)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<String>,

    /// Model name prefixes routed to this provider (e.g. "gpt-", "gemini-")
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub model_prefixes: Vec<String>,

    /// Additional headers to send with requests
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

impl ProviderConfig {
    /// Get the effective base URL (from env var if configured, otherwise default)
    pub fn get_base_url(&self) -> String {
        if let Some(env_var) = &self.api_base_env {
            if let Ok(url) = std::env::var(env_var) {
                if !url.trim().is_empty() {
                    return url;
                }
            }
        }
        self.base_url.clone()
    }

    /// Read the API key from the configured environment variable
    pub fn get_env_api_key(&self) -> Option<String> {
        self.api_key_env
            .as_ref()
            .and_then(|env_var| std::env::var(env_var).ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Whether `model` is listed verbatim
    pub fn serves_model(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }

    /// Length of the longest configured prefix matching `model`
    pub fn prefix_match_len(&self, model: &str) -> Option<usize> {
        self.model_prefixes
            .iter()
            .filter(|prefix| model.starts_with(prefix.as_str()))
            .map(|prefix| prefix.len())
            .max()
    }
}

/// Transport and decoding settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// TCP/TLS connect timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Maximum wait for the next body chunk, in seconds; `null` disables
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: Option<u64>,

    /// Unparseable SSE frames tolerated in a row before failing the stream
    #[serde(default = "default_max_consecutive_malformed")]
    pub max_consecutive_malformed: usize,
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_idle_timeout_secs() -> Option<u64> {
    Some(120)
}

fn default_max_consecutive_malformed() -> usize {
    DEFAULT_MAX_CONSECUTIVE_MALFORMED
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
            max_consecutive_malformed: default_max_consecutive_malformed(),
        }
    }
}

impl ClientSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }
}
