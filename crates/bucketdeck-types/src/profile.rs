use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::names::{validate_endpoint, validate_record_name};
use crate::record::{Record, RecordKind};

/// A connection profile for an S3-compatible storage service.
///
/// `Debug` output never contains the secret access key, and shows only the
/// first four characters of the access key id.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Profile name, unique within the profile space.
    pub name: String,
    pub region: String,
    /// Service endpoint URL. Empty means the provider default.
    pub endpoint: String,
    #[serde(rename = "forcePathStyle")]
    pub force_path_style: bool,
    #[serde(rename = "accessKeyId")]
    pub access_key_id: String,
    #[serde(rename = "secretAccessKey")]
    pub secret_access_key: String,
}

impl Profile {
    pub fn new(
        name: impl Into<String>,
        region: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
            endpoint: endpoint.into(),
            force_path_style: false,
            access_key_id: String::new(),
            secret_access_key: String::new(),
        }
    }

    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = access_key_id.into();
        self.secret_access_key = secret_access_key.into();
        self
    }

    pub fn with_path_style(mut self, force_path_style: bool) -> Self {
        self.force_path_style = force_path_style;
        self
    }

    /// Returns `true` if both halves of the credential pair are set.
    pub fn has_credentials(&self) -> bool {
        !self.access_key_id.is_empty() && !self.secret_access_key.is_empty()
    }
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key_hint: String = self.access_key_id.chars().take(4).collect();
        f.debug_struct("Profile")
            .field("name", &self.name)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("force_path_style", &self.force_path_style)
            .field("access_key_id", &format_args!("{key_hint}…"))
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

impl Record for Profile {
    const KIND: RecordKind = RecordKind::Profile;

    fn key(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), TypeError> {
        validate_record_name(&self.name)?;
        validate_endpoint(&self.endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Profile {
        Profile::new("minio", "us-east-1", "http://localhost:9000")
            .with_path_style(true)
            .with_credentials("AKIAEXAMPLE", "wJalrXUtnFEMI/K7MDENG")
    }

    #[test]
    fn uses_camel_case_wire_names() {
        let json: serde_json::Value = serde_json::from_slice(&sample().encode().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "minio",
                "region": "us-east-1",
                "endpoint": "http://localhost:9000",
                "forcePathStyle": true,
                "accessKeyId": "AKIAEXAMPLE",
                "secretAccessKey": "wJalrXUtnFEMI/K7MDENG",
            })
        );
    }

    #[test]
    fn encode_decode_preserves_profile() {
        let profile = sample();
        assert_eq!(Profile::decode(&profile.encode().unwrap()).unwrap(), profile);
    }

    #[test]
    fn debug_redacts_secret() {
        let debug = format!("{:?}", sample());
        assert!(!debug.contains("wJalrXUtnFEMI"));
        assert!(!debug.contains("AKIAEXAMPLE"));
        assert!(debug.contains("AKIA"));
        assert!(debug.contains("<redacted>"));
        assert!(debug.contains("minio"));
    }

    #[test]
    fn validation_checks_name_and_endpoint() {
        assert!(sample().validate().is_ok());
        assert!(Profile::new("", "r", "").validate().is_err());

        let err = Profile::new("p", "r", "localhost:9000").validate().unwrap_err();
        assert!(matches!(err, TypeError::InvalidEndpoint { .. }));
    }

    #[test]
    fn credentials_flag() {
        assert!(sample().has_credentials());
        assert!(!Profile::new("p", "r", "").has_credentials());
    }
}
