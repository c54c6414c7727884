/// Errors from key-value store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend cannot be opened or reached.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// An add targeted a key that already exists in the space.
    #[error("duplicate key {key:?} in space {space}")]
    DuplicateKey { space: String, key: String },

    /// The space was never created.
    #[error("unknown space: {0}")]
    UnknownSpace(String),

    /// Space names must be usable as file names.
    #[error("invalid space name {0:?}")]
    InvalidSpaceName(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed and cannot be used again.
    #[error("connection is closed")]
    Closed,
}

impl StoreError {
    /// Returns `true` for [`StoreError::DuplicateKey`].
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::DuplicateKey { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
