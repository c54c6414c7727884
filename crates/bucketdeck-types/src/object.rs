use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::names::validate_record_name;
use crate::record::{Record, RecordKind};

/// Metadata describing a single object inside a bucket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageObject {
    /// Object key, unique within the object space.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time in milliseconds since the UNIX epoch.
    pub last_modified: i64,
}

impl StorageObject {
    pub fn new(name: impl Into<String>, size: u64, last_modified: i64) -> Self {
        Self {
            name: name.into(),
            size,
            last_modified,
        }
    }
}

impl Record for StorageObject {
    const KIND: RecordKind = RecordKind::Object;

    fn key(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), TypeError> {
        validate_record_name(&self.name)
    }
}
