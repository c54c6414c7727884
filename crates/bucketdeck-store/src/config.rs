use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::log::LogConnector;
use crate::memory::MemoryConnector;
use crate::traits::Connector;

/// Flush/sync strategy for the log store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` after every write (safest, highest latency).
    EveryWrite,
    /// Flush to the OS and rely on page-cache buffering.
    #[default]
    OsDefault,
}

/// Which backend to open, and how.
///
/// In TOML:
///
/// ```toml
/// [backend]
/// kind = "log"
/// dir = "/var/lib/bucketdeck"
/// sync = "every_write"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Volatile in-memory store. Contents are lost on drop.
    #[default]
    Memory,
    /// Durable log-structured store rooted at `dir`.
    Log {
        dir: PathBuf,
        #[serde(default)]
        sync: SyncMode,
    },
}

impl BackendConfig {
    /// Build a connector for this backend.
    pub fn connector(&self) -> Arc<dyn Connector> {
        match self {
            BackendConfig::Memory => Arc::new(MemoryConnector::new()),
            BackendConfig::Log { dir, sync } => Arc::new(LogConnector::new(dir, sync.clone())),
        }
    }
}
