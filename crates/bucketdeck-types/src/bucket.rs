use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::names::validate_record_name;
use crate::record::{Record, RecordKind};

/// Metadata describing a cloud-storage bucket.
///
/// `acl` and `grants` are optional details reported by some providers; they
/// are left out of the stored encoding when absent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Bucket name, unique within the bucket space.
    pub name: String,
    /// Creation time in milliseconds since the UNIX epoch.
    pub creation_date: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grants: Option<Vec<String>>,
}

impl Bucket {
    pub fn new(name: impl Into<String>, creation_date: i64) -> Self {
        Self {
            name: name.into(),
            creation_date,
            acl: None,
            grants: None,
        }
    }

    /// Attach an access-control description.
    pub fn with_acl(mut self, acl: impl Into<String>, grants: Vec<String>) -> Self {
        self.acl = Some(acl.into());
        self.grants = Some(grants);
        self
    }
}

impl Record for Bucket {
    const KIND: RecordKind = RecordKind::Bucket;

    fn key(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), TypeError> {
        validate_record_name(&self.name)
    }
}
