//! Configuration Module
//!
//! Handles provider configuration loading and validation.

pub mod loader;
pub mod provider;

pub use loader::{ConfigLoader, PROVIDERS_PATH_ENV};
pub use provider::{ApiFormat, ClientSettings, ProviderConfig, ProvidersConfig};
