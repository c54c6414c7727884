use std::fmt;
use std::sync::Arc;

use bucketdeck_types::RecordKind;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::traits::{Connector, KvStore};

enum State {
    Idle,
    Ready(Arc<dyn KvStore>),
    Closed,
}

/// Lazily established, shared handle to a backing store.
///
/// The first call to [`get`](Self::get) connects and creates the configured
/// spaces. Callers arriving while that is in flight queue on the guard and
/// receive the same handle; the connector runs once. A failed attempt leaves
/// the connection idle so the next caller retries. After
/// [`close`](Self::close) every call fails with [`StoreError::Closed`].
pub struct Connection {
    connector: Arc<dyn Connector>,
    spaces: Vec<String>,
    state: Mutex<State>,
}

impl Connection {
    /// A connection that creates the `buckets`, `objects`, and `profiles`
    /// spaces on first use.
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self::with_spaces(connector, RecordKind::ALL.map(RecordKind::space))
    }

    /// A connection that creates the given spaces on first use.
    pub fn with_spaces<I, S>(connector: Arc<dyn Connector>, spaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            connector,
            spaces: spaces.into_iter().map(Into::into).collect(),
            state: Mutex::new(State::Idle),
        }
    }

    /// The shared store handle, connecting first if needed.
    pub async fn get(&self) -> StoreResult<Arc<dyn KvStore>> {
        let mut state = self.state.lock().await;
        match &*state {
            State::Ready(store) => return Ok(Arc::clone(store)),
            State::Closed => return Err(StoreError::Closed),
            State::Idle => {}
        }

        let store = self.connector.connect().await?;
        for space in &self.spaces {
            if store.create_space(space).await? {
                debug!(space = %space, "space created");
            }
        }
        info!(spaces = self.spaces.len(), "backing store connected");

        *state = State::Ready(Arc::clone(&store));
        Ok(store)
    }

    /// Returns `true` once a handle has been established and not closed.
    pub async fn is_connected(&self) -> bool {
        matches!(*self.state.lock().await, State::Ready(_))
    }

    /// Drop the handle. Later calls to [`get`](Self::get) fail.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if !matches!(*state, State::Closed) {
            *state = State::Closed;
            info!("backing store connection closed");
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("spaces", &self.spaces)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryConnector;

    fn setup() -> (Arc<MemoryConnector>, Connection) {
        let connector = Arc::new(MemoryConnector::new());
        let conn = Connection::new(connector.clone());
        (connector, conn)
    }

    #[tokio::test]
    async fn first_use_creates_record_spaces() {
        let (_, conn) = setup();
        let store = conn.get().await.unwrap();
        assert_eq!(
            store.spaces().await.unwrap(),
            vec!["buckets", "objects", "profiles"]
        );
    }

    #[tokio::test]
    async fn concurrent_first_callers_share_one_connect() {
        let (connector, conn) = setup();
        let (a, b, c) = tokio::join!(conn.get(), conn.get(), conn.get());
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

        assert_eq!(connector.attempts(), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &c));
    }

    #[tokio::test]
    async fn concurrent_callers_across_tasks() {
        let (connector, conn) = setup();
        let conn = Arc::new(conn);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let conn = Arc::clone(&conn);
                tokio::spawn(async move { conn.get().await.map(|_| ()) })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test]
    async fn failed_connect_is_retried() {
        let (connector, conn) = setup();
        connector.store().set_available(false);
        let err = conn.get().await.unwrap_err();
        assert!(matches!(err, StoreError::StorageUnavailable(_)));
        assert!(!conn.is_connected().await);

        connector.store().set_available(true);
        conn.get().await.unwrap();
        assert_eq!(connector.attempts(), 2);
        assert!(conn.is_connected().await);
    }

    #[tokio::test]
    async fn existing_spaces_are_kept() {
        let (connector, conn) = setup();
        let raw = connector.store();
        raw.create_space("profiles").await.unwrap();
        raw.add("profiles", "p1", vec![1]).await.unwrap();

        let store = conn.get().await.unwrap();
        assert_eq!(store.count("profiles").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn closed_connection_refuses_work() {
        let (connector, conn) = setup();
        conn.get().await.unwrap();
        conn.close().await;

        assert!(matches!(conn.get().await, Err(StoreError::Closed)));
        assert!(!conn.is_connected().await);
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test]
    async fn custom_spaces() {
        let connector = Arc::new(MemoryConnector::new());
        let conn = Connection::with_spaces(connector, ["alpha", "beta"]);
        let store = conn.get().await.unwrap();
        assert_eq!(store.spaces().await.unwrap(), vec!["alpha", "beta"]);
    }
}
