use thiserror::Error;

/// Errors produced by record validation and encoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid record name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}
