use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::traits::{Connector, KvStore};

type Space = BTreeMap<String, Vec<u8>>;

/// In-memory, HashMap-based key-value store.
///
/// Intended for tests and embedding. Spaces are held behind a `RwLock`;
/// values are cloned on read. [`set_available`](Self::set_available) lets
/// tests simulate an unreachable backend.
pub struct InMemoryKvStore {
    spaces: RwLock<HashMap<String, Space>>,
    available: AtomicBool,
}

impl InMemoryKvStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            spaces: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Mark the store reachable or unreachable.
    ///
    /// While unavailable every operation fails with `StorageUnavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Number of entries in a space, or zero if the space does not exist.
    pub fn len(&self, space: &str) -> usize {
        self.spaces
            .read()
            .expect("lock poisoned")
            .get(space)
            .map_or(0, BTreeMap::len)
    }

    /// Remove every space and entry.
    pub fn clear(&self) {
        self.spaces.write().expect("lock poisoned").clear();
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(StoreError::StorageUnavailable(
                "in-memory store is marked unavailable".into(),
            ))
        }
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn create_space(&self, space: &str) -> StoreResult<bool> {
        self.check_available()?;
        let mut spaces = self.spaces.write().expect("lock poisoned");
        if spaces.contains_key(space) {
            return Ok(false);
        }
        spaces.insert(space.to_string(), Space::new());
        Ok(true)
    }

    async fn spaces(&self) -> StoreResult<Vec<String>> {
        self.check_available()?;
        let spaces = self.spaces.read().expect("lock poisoned");
        let mut names: Vec<String> = spaces.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn get_all(&self, space: &str) -> StoreResult<Vec<(String, Vec<u8>)>> {
        self.check_available()?;
        let spaces = self.spaces.read().expect("lock poisoned");
        let entries = spaces
            .get(space)
            .ok_or_else(|| StoreError::UnknownSpace(space.to_string()))?;
        Ok(entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    async fn get(&self, space: &str, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.check_available()?;
        let spaces = self.spaces.read().expect("lock poisoned");
        let entries = spaces
            .get(space)
            .ok_or_else(|| StoreError::UnknownSpace(space.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    async fn add(&self, space: &str, key: &str, value: Vec<u8>) -> StoreResult<()> {
        self.check_available()?;
        let mut spaces = self.spaces.write().expect("lock poisoned");
        let entries = spaces
            .get_mut(space)
            .ok_or_else(|| StoreError::UnknownSpace(space.to_string()))?;
        if entries.contains_key(key) {
            return Err(StoreError::DuplicateKey {
                space: space.to_string(),
                key: key.to_string(),
            });
        }
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, space: &str, key: &str) -> StoreResult<bool> {
        self.check_available()?;
        let mut spaces = self.spaces.write().expect("lock poisoned");
        let entries = spaces
            .get_mut(space)
            .ok_or_else(|| StoreError::UnknownSpace(space.to_string()))?;
        Ok(entries.remove(key).is_some())
    }

    async fn count(&self, space: &str) -> StoreResult<usize> {
        self.check_available()?;
        let spaces = self.spaces.read().expect("lock poisoned");
        spaces
            .get(space)
            .map(BTreeMap::len)
            .ok_or_else(|| StoreError::UnknownSpace(space.to_string()))
    }
}

impl std::fmt::Debug for InMemoryKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let space_count = self.spaces.read().expect("lock poisoned").len();
        f.debug_struct("InMemoryKvStore")
            .field("space_count", &space_count)
            .field("available", &self.is_available())
            .finish()
    }
}

/// Connector handing out one shared [`InMemoryKvStore`].
///
/// Counts connect attempts so callers can check that a connection was
/// established only once. Connecting fails while the store is unavailable.
#[derive(Debug, Default)]
pub struct MemoryConnector {
    store: Arc<InMemoryKvStore>,
    attempts: AtomicUsize,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing store, e.g. to share it between several connections.
    pub fn with_store(store: Arc<InMemoryKvStore>) -> Self {
        Self {
            store,
            attempts: AtomicUsize::new(0),
        }
    }

    /// The store this connector hands out.
    pub fn store(&self) -> &Arc<InMemoryKvStore> {
        &self.store
    }

    /// How many times `connect` has been called.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> StoreResult<Arc<dyn KvStore>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        // Suspend once so racing callers really overlap.
        tokio::task::yield_now().await;
        self.store.check_available()?;
        let store: Arc<dyn KvStore> = self.store.clone();
        Ok(store)
    }
}
