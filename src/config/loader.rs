//! Configuration Loader
//!
//! Loads and merges provider configurations from multiple sources.

use crate::config::provider::ProvidersConfig;
use crate::error::{ChatError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable pointing at an extra providers file
pub const PROVIDERS_PATH_ENV: &str = "CHATWIRE_PROVIDERS_PATH";

/// Configuration loader with support for multiple sources
pub struct ConfigLoader {
    config: ProvidersConfig,
}

impl ConfigLoader {
    /// Create a new config loader and load from default locations
    pub fn new() -> Result<Self> {
        // API keys commonly live in a .env next to the app
        let _ = dotenvy::dotenv();

        let mut loader = Self {
            config: ProvidersConfig::default(),
        };

        // Load built-in defaults first
        loader.load_builtin_defaults()?;

        // Then load from file system (can override built-ins)
        loader.load_from_default_paths()?;

        Ok(loader)
    }

    /// Create a loader with a specific config file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut loader = Self {
            config: ProvidersConfig::default(),
        };

        loader.load_builtin_defaults()?;
        loader.load_from_file(path)?;

        Ok(loader)
    }

    /// Load built-in provider defaults
    fn load_builtin_defaults(&mut self) -> Result<()> {
        let defaults = include_str!("../../providers.json");
        let config: ProvidersConfig = serde_json::from_str(defaults).map_err(|e| {
            ChatError::Config(format!("Failed to parse built-in providers.json: {}", e))
        })?;

        self.merge_config(config);
        Ok(())
    }

    /// Load configuration from default paths
    fn load_from_default_paths(&mut self) -> Result<()> {
        for path in Self::get_config_paths() {
            if path.exists() {
                self.load_from_file(&path)?;
            }
        }

        Ok(())
    }

    /// Get list of config paths to check, lowest precedence first
    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".chatwire").join("providers.json"));
        }

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("chatwire").join("providers.json"));
        }

        paths.push(PathBuf::from("chatwire.json"));
        paths.push(PathBuf::from("providers.json"));

        if let Ok(custom_path) = std::env::var(PROVIDERS_PATH_ENV) {
            paths.push(PathBuf::from(custom_path));
        }

        paths
    }

    /// Load configuration from a specific file
    fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ChatError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: ProvidersConfig = serde_json::from_str(&content).map_err(|e| {
            ChatError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        debug!(path = %path.display(), providers = config.providers.len(), "Loaded provider config");
        self.merge_config(config);
        Ok(())
    }

    /// Merge another config into this one (later configs override earlier)
    fn merge_config(&mut self, other: ProvidersConfig) {
        for (name, provider) in other.providers {
            self.config.providers.insert(name, provider);
        }

        if other.client.is_some() {
            self.config.client = other.client;
        }
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &ProvidersConfig {
        &self.config
    }

    /// Take ownership of the configuration
    pub fn into_config(self) -> ProvidersConfig {
        self.config
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self {
            config: ProvidersConfig::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::provider::{ApiFormat, ClientSettings, ProviderConfig};
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_builtin_defaults() {
        let mut loader = ConfigLoader {
            config: ProvidersConfig::default(),
        };
        loader.load_builtin_defaults().unwrap();

        let providers = &loader.config().providers;
        assert!(providers.contains_key("openai"));
        assert!(providers.contains_key("deepseek"));
        assert_eq!(providers["google"].api_format, Some(ApiFormat::Google));
    }

    #[test]
    fn test_load_from_custom_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{
                "providers": {{
                    "local": {{
                        "base_url": "http://localhost:11434/v1",
                        "models": ["llama3"]
                    }}
                }},
                "client": {{ "idle_timeout_secs": 30 }}
            }}"#
        )
        .unwrap();

        let loader = ConfigLoader::from_path(file.path()).unwrap();
        assert!(loader.config().providers.contains_key("local"));
        assert!(loader.config().providers.contains_key("openai"));
        assert_eq!(
            loader.config().client.as_ref().unwrap().idle_timeout_secs,
            Some(30)
        );
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{ not json").unwrap();

        let err = ConfigLoader::from_path(file.path()).err().unwrap();
        assert!(matches!(err, ChatError::Config(_)));
    }

    #[test]
    fn test_merge_overrides_existing_provider() {
        let mut loader = ConfigLoader {
            config: ProvidersConfig::default(),
        };
        loader.load_builtin_defaults().unwrap();
        let initial_count = loader.config().providers.len();

        let custom = ProvidersConfig {
            providers: [(
                "openai".to_string(),
                ProviderConfig {
                    base_url: "https://proxy.internal/v1".to_string(),
                    api_key_env: Some("PROXY_KEY".to_string()),
                    api_base_env: None,
                    api_format: Some(ApiFormat::Openai),
                    models: vec![],
                    model_prefixes: vec!["gpt-".to_string()],
                    headers: HashMap::new(),
                },
            )]
            .into_iter()
            .collect(),
            client: Some(ClientSettings::default()),
        };

        loader.merge_config(custom);
        assert_eq!(loader.config().providers.len(), initial_count);
        assert_eq!(
            loader.config().providers["openai"].base_url,
            "https://proxy.internal/v1"
        );
        assert!(loader.config().client.is_some());
    }
}
