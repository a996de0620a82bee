//! Router Module
//!
//! Model routing and provider credential resolution.

pub mod credentials;
pub mod registry;
pub mod strategy;

pub use credentials::{CredentialResolver, ProviderCredentials, ResolvedModel};
pub use registry::{ProviderInfo, ProviderRegistry};
pub use strategy::ModelRoute;
