//! Resolved provider credentials.

use crate::config::ApiFormat;
use crate::error::Result;
use std::collections::HashMap;
use std::fmt;

/// Everything needed to reach one provider for one call
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    /// Provider id (e.g. "openai", "deepseek", "google")
    pub provider_id: String,

    /// API key
    pub api_key: String,

    /// Base URL for the API
    pub base_url: String,

    /// Declared wire protocol; `None` infers it from the provider id
    pub api_format: Option<ApiFormat>,

    /// Additional headers to send with requests
    pub headers: HashMap<String, String>,
}

impl ProviderCredentials {
    pub fn new(
        provider_id: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            api_format: None,
            headers: HashMap::new(),
        }
    }

    /// Declare the wire protocol explicitly
    pub fn with_api_format(mut self, format: ApiFormat) -> Self {
        self.api_format = Some(format);
        self
    }

    /// Add an extra request header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

// Keeps API keys out of logs
impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("provider_id", &self.provider_id)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("api_format", &self.api_format)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Resolver output for one requested model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel {
    pub credentials: ProviderCredentials,

    /// Model identifier sent on the wire
    pub model: String,
}

impl ResolvedModel {
    pub fn new(credentials: ProviderCredentials, model: impl Into<String>) -> Self {
        Self {
            credentials,
            model: model.into(),
        }
    }
}

/// Model → provider credential lookup.
///
/// Called once per chat call, so a conversation that switches models between
/// turns is routed by the model of the current turn.
pub trait CredentialResolver: Send + Sync {
    fn resolve_model(&self, model: &str) -> Result<ResolvedModel>;
}

impl<F> CredentialResolver for F
where
    F: Fn(&str) -> Result<ResolvedModel> + Send + Sync,
{
    fn resolve_model(&self, model: &str) -> Result<ResolvedModel> {
        self(model)
    }
}
