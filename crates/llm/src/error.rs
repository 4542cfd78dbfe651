use thiserror::Error;

/// Error taxonomy surfaced by the adapter (spec §4.1, §7).
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("provider {provider} does not support capability {capability}")]
    UnsupportedCapability {
        provider: String,
        capability: String,
    },

    #[error("no provider available in tier {tier:?}")]
    ModelUnavailable { tier: crate::ProviderTier },

    #[error("all provider candidates failed; last error from {last_provider}: {source}")]
    AllProvidersFailed {
        last_provider: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("provider {provider} request timed out")]
    Timeout { provider: String },

    #[error("provider {provider} transport error: {source}")]
    Transport {
        provider: String,
        #[source]
        source: anyhow::Error,
    },
}
