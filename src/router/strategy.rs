//! Model Routing
//!
//! Parses the explicit `provider/model` form of a model identifier.

/// Explicitly routed model identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRoute {
    /// Provider id (e.g. "openai", "google")
    pub provider: String,

    /// Model name as sent to the provider (may itself contain '/')
    pub model: String,
}

impl ModelRoute {
    /// Parse `provider/model`.
    ///
    /// Only the first '/' separates the provider, so
    /// `openrouter/meta-llama/llama-3-70b` keeps `meta-llama/llama-3-70b` as
    /// the model. Returns `None` when either side is empty or there is no '/'.
    pub fn parse(model_string: &str) -> Option<Self> {
        let (provider, model) = model_string.split_once('/')?;
        let (provider, model) = (provider.trim(), model.trim());

        if provider.is_empty() || model.is_empty() {
            return None;
        }

        Some(Self {
            provider: provider.to_string(),
            model: model.to_string(),
        })
    }
}

impl std::fmt::Display for ModelRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let route = ModelRoute::parse("openai/gpt-4").unwrap();
        assert_eq!(route.provider, "openai");
        assert_eq!(route.model, "gpt-4");
    }

    #[test]
    fn test_parse_nested_model() {
        let route = ModelRoute::parse("openrouter/meta-llama/llama-3-70b").unwrap();
        assert_eq!(route.provider, "openrouter");
        assert_eq!(route.model, "meta-llama/llama-3-70b");
    }

    #[test]
    fn test_parse_bare_or_invalid() {
        assert!(ModelRoute::parse("gpt-4").is_none());
        assert!(ModelRoute::parse("/gpt-4").is_none());
        assert!(ModelRoute::parse("openai/").is_none());
    }

    #[test]
    fn test_display() {
        let route = ModelRoute::parse("google/gemini-2.5-flash").unwrap();
        assert_eq!(format!("{}", route), "google/gemini-2.5-flash");
    }
}
