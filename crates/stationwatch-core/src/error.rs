//! Error types for StationWatch

use thiserror::Error;

/// Result type alias using StationWatch's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for StationWatch operations
///
/// None of these are fatal inside a monitoring cycle. Each one is contained
/// at the operator or provider that produced it.
#[derive(Error, Debug)]
pub enum Error {
    /// A balance, deposit or gas price read could not complete
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// Non-positive unit cost or malformed threshold bounds
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A requested channel name has no registered provider
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Transport error or non-success response from a channel
    #[error("Delivery failure on {provider}: {reason}")]
    DeliveryFailure {
        /// Provider name
        provider: String,
        /// What went wrong
        reason: String,
    },

    /// Configuration could not be loaded at startup
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON-RPC error object returned by the node
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// Error message from the node
        message: String,
    },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a data unavailable error
    pub fn data_unavailable(msg: impl Into<String>) -> Self {
        Self::DataUnavailable(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create an unknown provider error
    pub fn unknown_provider(name: impl Into<String>) -> Self {
        Self::UnknownProvider(name.into())
    }

    /// Create a delivery failure error
    pub fn delivery(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DeliveryFailure {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
