use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The three record kinds, each persisted in its own key-value space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Bucket,
    Object,
    Profile,
}

impl RecordKind {
    /// Every record kind, in space-creation order.
    pub const ALL: [RecordKind; 3] = [RecordKind::Bucket, RecordKind::Object, RecordKind::Profile];

    /// Name of the key-value space holding records of this kind.
    pub const fn space(self) -> &'static str {
        match self {
            RecordKind::Bucket => "buckets",
            RecordKind::Object => "objects",
            RecordKind::Profile => "profiles",
        }
    }

    /// Look up the record kind stored in the named space.
    pub fn from_space(space: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.space() == space)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordKind::Bucket => "bucket",
            RecordKind::Object => "object",
            RecordKind::Profile => "profile",
        };
        f.write_str(s)
    }
}

impl FromStr for RecordKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bucket" | "buckets" => Ok(RecordKind::Bucket),
            "object" | "objects" => Ok(RecordKind::Object),
            "profile" | "profiles" => Ok(RecordKind::Profile),
            other => Err(TypeError::Serialization(format!("unknown record kind: {other}"))),
        }
    }
}

/// A record that can be stored in a key-value space.
///
/// The record's `name` is its key. The JSON encoding produced by
/// [`Record::encode`] is the serialization contract with the backing store:
/// field names and types round-trip exactly.
pub trait Record: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static {
    /// Which space this record lives in.
    const KIND: RecordKind;

    /// The record's unique key within its space.
    fn key(&self) -> &str;

    /// Check the record's invariants before it is persisted.
    fn validate(&self) -> Result<(), TypeError>;

    /// Encode the record for storage.
    fn encode(&self) -> Result<Vec<u8>, TypeError> {
        serde_json::to_vec(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// Decode a record previously produced by [`Record::encode`].
    fn decode(bytes: &[u8]) -> Result<Self, TypeError> {
        serde_json::from_slice(bytes).map_err(|e| TypeError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_names() {
        assert_eq!(RecordKind::Bucket.space(), "buckets");
        assert_eq!(RecordKind::Object.space(), "objects");
        assert_eq!(RecordKind::Profile.space(), "profiles");
    }

    #[test]
    fn from_space_inverts_space() {
        for kind in RecordKind::ALL {
            assert_eq!(RecordKind::from_space(kind.space()), Some(kind));
        }
        assert_eq!(RecordKind::from_space("widgets"), None);
    }

    #[test]
    fn display_and_parse() {
        for kind in RecordKind::ALL {
            let parsed: RecordKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("nope".parse::<RecordKind>().is_err());
    }

    #[test]
    fn kind_serde_is_snake_case() {
        let json = serde_json::to_string(&RecordKind::Profile).unwrap();
        assert_eq!(json, "\"profile\"");
    }
}
