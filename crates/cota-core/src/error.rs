//! Error types for data-source operations.
//!
//! This module defines [`ProviderError`] which covers all error cases that can
//! occur when fetching, parsing, or caching market data. None of these errors
//! are fatal to an analysis: the analyzer treats any failing source as silent
//! and lets the remaining sources compensate.

use thiserror::Error;

/// Errors that can occur while talking to a data source.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Network-related errors (connection failures, timeouts, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// Rate limit exceeded by a provider.
    #[error("Rate limited by {provider}: retry after {retry_after:?}")]
    RateLimited {
        /// The provider that rate limited the request.
        provider: String,
        /// Suggested time to wait before retrying.
        retry_after: Option<std::time::Duration>,
    },

    /// The requested ticker was not found.
    #[error("Ticker not found: {0}")]
    TickerNotFound(String),

    /// The provider answered but carried no usable data for the ticker.
    #[error("No data available for {ticker} from {provider}")]
    DataNotAvailable {
        /// The provider that was queried.
        provider: String,
        /// The ticker that was requested.
        ticker: String,
    },

    /// Error parsing a provider payload.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error interacting with the response cache.
    #[error("Cache error: {0}")]
    Cache(String),

    /// Authentication failed for a provider.
    #[error("Authentication failed for provider {0}")]
    AuthenticationFailed(String),

    /// The requested capability is not supported by this provider.
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// The provider is disabled by configuration.
    #[error("Provider disabled: {0}")]
    Disabled(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias using [`ProviderError`].
pub type Result<T> = std::result::Result<T, ProviderError>;
