//! Error types for the leadsite library.

use thiserror::Error;

/// Errors that can occur outside the estimator's pure computation path.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during storage or config file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file could not be parsed.
    #[error("config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// Configuration could not be serialized.
    #[error("config write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The key-value store rejected an operation.
    #[error("storage error: {0}")]
    Storage(String),

    /// The offline cache could not complete an operation.
    #[error("cache error: {0}")]
    Cache(String),

    /// The subscribe endpoint rejected the submission.
    #[error("subscribe failed: {0}")]
    Subscribe(String),

    /// An analytics sink failed to record an event.
    #[error("analytics error: {0}")]
    Analytics(String),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// A specialized `Result` type for leadsite operations.
pub type Result<T> = std::result::Result<T, Error>;
