use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreResult;

/// A durable dictionary of named spaces, each mapping string keys to bytes.
///
/// All implementations must satisfy these invariants:
/// - `add` fails with `DuplicateKey` rather than overwriting.
/// - `delete` of an absent key succeeds and returns `false`.
/// - `get_all` returns entries sorted by key.
/// - Operating on a space that was never created fails with `UnknownSpace`.
#[async_trait]
pub trait KvStore: Send + Sync + fmt::Debug {
    /// Create a space if it does not exist. Returns `true` if it was created.
    async fn create_space(&self, space: &str) -> StoreResult<bool>;

    /// Names of all existing spaces, sorted.
    async fn spaces(&self) -> StoreResult<Vec<String>>;

    /// Every entry in a space, in ascending key order.
    async fn get_all(&self, space: &str) -> StoreResult<Vec<(String, Vec<u8>)>>;

    /// Read a single entry. Returns `Ok(None)` if the key does not exist.
    async fn get(&self, space: &str, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Insert a new entry. Fails with `DuplicateKey` if the key exists.
    async fn add(&self, space: &str, key: &str, value: Vec<u8>) -> StoreResult<()>;

    /// Delete an entry. Returns `true` if the key existed.
    async fn delete(&self, space: &str, key: &str) -> StoreResult<bool>;

    /// Number of entries in a space.
    ///
    /// Default implementation counts `get_all()`. Backends may override.
    async fn count(&self, space: &str) -> StoreResult<usize> {
        Ok(self.get_all(space).await?.len())
    }
}

/// Opens a [`KvStore`] backend.
///
/// Callers normally go through [`Connection`](crate::Connection), which
/// guarantees `connect` runs once per connection lifetime.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> StoreResult<Arc<dyn KvStore>>;
}
