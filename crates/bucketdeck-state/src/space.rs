use bucketdeck_store::Connection;
use bucketdeck_types::Record;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::observable::Observable;

/// One record kind: its observable mirror plus the queue its operations
/// run through.
///
/// Every operation holds the space's FIFO mutex from the backend call until
/// the mirror has been updated, so operations on one kind apply in the order
/// they were issued, even when callers do not await each other. Different
/// kinds never contend.
pub struct RecordSpace<R> {
    records: Observable<Vec<R>>,
    queue: Mutex<()>,
}

impl<R: Record> RecordSpace<R> {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Observable::new(Vec::new(), capacity),
            queue: Mutex::new(()),
        }
    }

    pub fn records(&self) -> &Observable<Vec<R>> {
        &self.records
    }

    /// Replace the mirror with the full contents of the persisted space.
    ///
    /// If any stored value fails to decode the mirror is left as it was.
    pub async fn load(&self, connection: &Connection) -> StateResult<usize> {
        let _turn = self.queue.lock().await;
        let store = connection
            .get()
            .await
            .map_err(|e| StateError::from_store(R::KIND, e))?;
        let entries = store
            .get_all(R::KIND.space())
            .await
            .map_err(|e| StateError::from_store(R::KIND, e))?;

        let records = entries
            .into_iter()
            .map(|(key, bytes)| {
                R::decode(&bytes).map_err(|e| StateError::CorruptRecord {
                    kind: R::KIND,
                    key,
                    reason: e.to_string(),
                })
            })
            .collect::<StateResult<Vec<R>>>()?;

        let count = records.len();
        self.records.set(records);
        debug!(kind = %R::KIND, count, "collection loaded");
        Ok(count)
    }

    /// Persist a new record, then append it to the mirror.
    pub async fn add(&self, connection: &Connection, record: R) -> StateResult<()> {
        record.validate()?;
        let bytes = record.encode()?;

        let _turn = self.queue.lock().await;
        let store = connection
            .get()
            .await
            .map_err(|e| StateError::from_store(R::KIND, e))?;
        store
            .add(R::KIND.space(), record.key(), bytes)
            .await
            .map_err(|e| StateError::from_store(R::KIND, e))?;

        debug!(kind = %R::KIND, name = record.key(), "record added");
        self.records.push(record);
        Ok(())
    }

    /// Delete a record by key, then drop it from the mirror.
    ///
    /// Returns `true` if the key was persisted. A missing key is not an error.
    pub async fn delete(&self, connection: &Connection, key: &str) -> StateResult<bool> {
        let _turn = self.queue.lock().await;
        let store = connection
            .get()
            .await
            .map_err(|e| StateError::from_store(R::KIND, e))?;
        let existed = store
            .delete(R::KIND.space(), key)
            .await
            .map_err(|e| StateError::from_store(R::KIND, e))?;

        let removed = self.records.remove_where(|r| r.key() == key);
        debug!(kind = %R::KIND, name = key, existed, removed, "record deleted");
        Ok(existed)
    }
}

impl<R: std::fmt::Debug> std::fmt::Debug for RecordSpace<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordSpace")
            .field("records", &self.records)
            .finish_non_exhaustive()
    }
}
