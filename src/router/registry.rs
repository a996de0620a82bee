//! Provider Registry
//!
//! Default [`CredentialResolver`]: routes model names to configured providers
//! and resolves their API keys.

use crate::config::{ApiFormat, ConfigLoader, ProviderConfig, ProvidersConfig};
use crate::error::{ChatError, Result};
use crate::router::credentials::{CredentialResolver, ProviderCredentials, ResolvedModel};
use crate::router::strategy::ModelRoute;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Registry of configured providers
#[derive(Debug)]
pub struct ProviderRegistry {
    config: ProvidersConfig,

    /// Keys set at runtime (e.g. from the app's encrypted settings store),
    /// taking precedence over environment variables
    api_keys: RwLock<HashMap<String, String>>,
}

impl ProviderRegistry {
    /// Create a registry from default config locations
    pub fn new() -> Result<Self> {
        Ok(Self::from_config(ConfigLoader::new()?.into_config()))
    }

    /// Create a registry with a custom config path
    pub fn with_config_path(path: &str) -> Result<Self> {
        Ok(Self::from_config(ConfigLoader::from_path(path)?.into_config()))
    }

    /// Create a registry from a config object
    pub fn from_config(config: ProvidersConfig) -> Self {
        Self {
            config,
            api_keys: RwLock::new(HashMap::new()),
        }
    }

    /// The underlying configuration
    pub fn config(&self) -> &ProvidersConfig {
        &self.config
    }

    /// Set or replace the API key for a provider
    pub fn set_api_key(&self, provider: &str, key: impl Into<String>) {
        self.api_keys.write().insert(provider.to_string(), key.into());
    }

    /// Remove a runtime API key, falling back to the environment
    pub fn clear_api_key(&self, provider: &str) {
        self.api_keys.write().remove(provider);
    }

    /// Get a provider configuration
    fn get_provider(&self, name: &str) -> Result<&ProviderConfig> {
        self.config
            .providers
            .get(name)
            .ok_or_else(|| ChatError::ProviderNotFound(name.to_string()))
    }

    /// Get an API key for a provider
    fn get_api_key(&self, provider: &str, config: &ProviderConfig) -> Result<String> {
        if let Some(key) = self.api_keys.read().get(provider) {
            return Ok(key.clone());
        }

        config.get_env_api_key().ok_or_else(|| ChatError::NoApiKey {
            provider: provider.to_string(),
            env: config
                .api_key_env
                .clone()
                .unwrap_or_else(|| format!("{}_API_KEY", provider.to_uppercase())),
        })
    }

    /// Find the provider serving `model`, and the name to send on the wire.
    ///
    /// Order: explicit `provider/model` naming a configured provider, exact
    /// entry in a provider's `models`, then the longest matching prefix.
    pub fn route(&self, model: &str) -> Result<(String, String)> {
        if let Some(route) = ModelRoute::parse(model) {
            if self.config.providers.contains_key(&route.provider) {
                return Ok((route.provider, route.model));
            }
        }

        let mut exact: Vec<&String> = self
            .config
            .providers
            .iter()
            .filter(|(_, p)| p.serves_model(model))
            .map(|(name, _)| name)
            .collect();
        // HashMap order is unstable; pick deterministically
        exact.sort();
        if let Some(name) = exact.first() {
            return Ok(((*name).clone(), model.to_string()));
        }

        self.config
            .providers
            .iter()
            .filter_map(|(name, p)| p.prefix_match_len(model).map(|len| (len, name)))
            .max_by(|(a_len, a_name), (b_len, b_name)| {
                a_len.cmp(b_len).then_with(|| b_name.cmp(a_name))
            })
            .map(|(_, name)| (name.clone(), model.to_string()))
            .ok_or_else(|| ChatError::UnknownModel(model.to_string()))
    }

    /// Resolve credentials for a model
    pub fn resolve(&self, model: &str) -> Result<ResolvedModel> {
        let (provider, wire_model) = self.route(model)?;
        let config = self.get_provider(&provider)?;
        let api_key = self.get_api_key(&provider, config)?;

        debug!(model, provider = %provider, wire_model = %wire_model, "Resolved model");

        let credentials = ProviderCredentials {
            provider_id: provider,
            api_key,
            base_url: config.get_base_url(),
            api_format: config.api_format,
            headers: config.headers.clone(),
        };

        Ok(ResolvedModel::new(credentials, wire_model))
    }

    /// List available providers
    pub fn providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.config.providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get provider info
    pub fn provider_info(&self, name: &str) -> Option<ProviderInfo> {
        self.config.providers.get(name).map(|p| ProviderInfo {
            name: name.to_string(),
            base_url: p.base_url.clone(),
            api_format: p
                .api_format
                .unwrap_or_else(|| ApiFormat::for_provider_id(name)),
            models: p.models.clone(),
            has_key: self.api_keys.read().contains_key(name) || p.get_env_api_key().is_some(),
        })
    }
}

impl CredentialResolver for ProviderRegistry {
    fn resolve_model(&self, model: &str) -> Result<ResolvedModel> {
        self.resolve(model)
    }
}

/// Provider information
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    pub name: String,
    pub base_url: String,
    /// Declared format, or the one implied by the provider id
    pub api_format: ApiFormat,
    pub models: Vec<String>,
    pub has_key: bool,
}
