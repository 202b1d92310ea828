//! Provider error types.

use thiserror::Error;

/// Result type alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors raised by provider adapters and the provider registry.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("provider {provider} api error: {message}")]
    Api { provider: String, message: String },

    #[error("workload not found: {0}")]
    WorkloadNotFound(String),

    #[error("invalid config for provider {provider}: {reason}")]
    InvalidConfig { provider: String, reason: String },

    #[error("no factory registered for provider type: {0}")]
    UnknownProviderType(String),

    #[error("provider call timed out: {0}")]
    Timeout(String),
}

impl ProviderError {
    pub fn api(provider: &str, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_config(provider: &str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            provider: provider.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this is a registration-time configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. } | Self::UnknownProviderType(_))
    }
}
