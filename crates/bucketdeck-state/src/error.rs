use bucketdeck_store::StoreError;
use bucketdeck_types::{RecordKind, TypeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    /// The backing store could not be opened or accessed.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] StoreError),

    #[error("{kind} {name:?} already exists")]
    DuplicateKey { kind: RecordKind, name: String },

    #[error("invalid record: {0}")]
    InvalidRecord(#[from] TypeError),

    /// A stored value could not be decoded as a record.
    #[error("corrupt {kind} record {key:?}: {reason}")]
    CorruptRecord {
        kind: RecordKind,
        key: String,
        reason: String,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("profile store is closed")]
    Closed,
}

impl StateError {
    /// Classify a backend failure for an operation on `kind`.
    pub fn from_store(kind: RecordKind, err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey { key, .. } => StateError::DuplicateKey { kind, name: key },
            other => Self::from_backend(other),
        }
    }

    /// Classify a backend failure not tied to a record kind, such as
    /// opening the connection.
    pub fn from_backend(err: StoreError) -> Self {
        match err {
            StoreError::Closed => StateError::Closed,
            other => StateError::StorageUnavailable(other),
        }
    }
}

pub type StateResult<T> = Result<T, StateError>;

/// Errors seen by a [`Subscription`](crate::Subscription).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The subscriber fell behind and this many values were dropped.
    #[error("subscriber lagged behind by {0} updates")]
    Lagged(u64),

    /// The observable was dropped.
    #[error("observable closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_keeps_kind_and_name() {
        let err = StateError::from_store(
            RecordKind::Profile,
            StoreError::DuplicateKey {
                space: "profiles".into(),
                key: "p1".into(),
            },
        );
        assert!(matches!(
            err,
            StateError::DuplicateKey { kind: RecordKind::Profile, ref name } if name == "p1"
        ));
        assert_eq!(err.to_string(), "profile \"p1\" already exists");
    }

    #[test]
    fn other_store_errors_are_unavailable() {
        for err in [
            StoreError::StorageUnavailable("down".into()),
            StoreError::UnknownSpace("buckets".into()),
            StoreError::Io(std::io::Error::other("disk")),
        ] {
            assert!(matches!(
                StateError::from_store(RecordKind::Bucket, err),
                StateError::StorageUnavailable(_)
            ));
        }
    }

    #[test]
    fn closed_maps_to_closed() {
        assert!(matches!(
            StateError::from_store(RecordKind::Object, StoreError::Closed),
            StateError::Closed
        ));
    }

    #[test]
    fn backend_errors_share_the_store_mapping() {
        assert!(matches!(
            StateError::from_backend(StoreError::Closed),
            StateError::Closed
        ));
        assert!(matches!(
            StateError::from_backend(StoreError::StorageUnavailable("down".into())),
            StateError::StorageUnavailable(_)
        ));
    }
}
