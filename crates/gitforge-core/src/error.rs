//! Error types for gitforge.

use thiserror::Error;

/// Main error type for gitforge operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed before a response was received
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication failed or credentials are incomplete
    #[error("Authentication error: {0}")]
    Auth(String),

    /// No credential could be resolved for a server
    #[error("no credentials available: {0}")]
    NoCredentials(String),

    /// 401 from the vendor
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 404 from the vendor
    #[error("Not found: {0}")]
    NotFound(String),

    /// The resource being created already exists
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// 5xx from the vendor
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Any other non-success API response
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body could not be interpreted
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A server URL could not be parsed
    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    /// Credential store persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Interactive input failed or was required in batch mode
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// The backend does not support this operation
    #[error("{operation} is not implemented for {provider}")]
    NotImplemented { provider: String, operation: String },

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Map an HTTP status code and response body to an error.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => Error::Unauthorized(message),
            404 => Error::NotFound(message),
            500..=599 => Error::ServerError { status, message },
            _ => Error::Api { status, message },
        }
    }

    /// Shorthand for an unsupported operation on a backend.
    pub fn not_implemented(provider: impl Into<String>, operation: impl Into<String>) -> Self {
        Error::NotImplemented {
            provider: provider.into(),
            operation: operation.into(),
        }
    }

    /// True when the vendor reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

/// Result type alias for gitforge operations.
pub type Result<T> = std::result::Result<T, Error>;
