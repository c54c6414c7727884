use std::path::Path;

use bucketdeck_store::BackendConfig;
use serde::{Deserialize, Serialize};

use crate::error::{StateError, StateResult};

/// Configuration for a [`ProfileStore`](crate::ProfileStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Backing store to persist records in.
    pub backend: BackendConfig,
    /// Buffered updates per subscriber before it is reported as lagging.
    pub channel_capacity: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::Memory,
            channel_capacity: 1024,
        }
    }
}

impl StateConfig {
    pub fn from_toml_str(s: &str) -> StateResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| StateError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> StateResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| StateError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> StateResult<()> {
        if self.channel_capacity == 0 {
            return Err(StateError::Config("channel_capacity must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bucketdeck_store::SyncMode;
    use std::path::PathBuf;

    #[test]
    fn default_config() {
        let c = StateConfig::default();
        assert_eq!(c.backend, BackendConfig::Memory);
        assert_eq!(c.channel_capacity, 1024);
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(StateConfig::from_toml_str("").unwrap(), StateConfig::default());
    }

    #[test]
    fn full_toml() {
        let c = StateConfig::from_toml_str(
            r#"
            channel_capacity = 256

            [backend]
            kind = "log"
            dir = "/var/lib/bucketdeck"
            sync = "every_write"
            "#,
        )
        .unwrap();
        assert_eq!(c.channel_capacity, 256);
        assert_eq!(
            c.backend,
            BackendConfig::Log {
                dir: PathBuf::from("/var/lib/bucketdeck"),
                sync: SyncMode::EveryWrite,
            }
        );
    }

    #[test]
    fn zero_capacity_rejected() {
        let err = StateConfig::from_toml_str("channel_capacity = 0").unwrap_err();
        assert!(matches!(err, StateError::Config(_)));
    }

    #[test]
    fn malformed_toml_rejected() {
        assert!(matches!(
            StateConfig::from_toml_str("channel_capacity = \"lots\""),
            Err(StateError::Config(_))
        ));
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bucketdeck.toml");
        std::fs::write(&path, "channel_capacity = 8\n").unwrap();
        assert_eq!(StateConfig::from_file(&path).unwrap().channel_capacity, 8);

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            StateConfig::from_file(&missing),
            Err(StateError::Config(_))
        ));
    }
}
