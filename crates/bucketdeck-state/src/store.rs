use std::sync::Arc;

use bucketdeck_store::{Connection, Connector};
use bucketdeck_types::{Bucket, Profile, RecordKind, StorageObject};
use tracing::{debug, info};

use crate::config::StateConfig;
use crate::error::{StateError, StateResult};
use crate::observable::Observable;
use crate::space::RecordSpace;

/// Buckets, objects, and profiles mirrored between observable collections
/// and a durable key-value store.
///
/// Mutations are write-through: the backend must accept a change before the
/// matching collection reflects it, and a failed call leaves the collection
/// and its subscribers untouched. The current-profile selection lives only
/// in memory and starts out empty.
///
/// The backend is connected lazily on first use (or eagerly via
/// [`connect`](Self::connect)). [`close`](Self::close) ends the store's
/// lifetime; later persistent operations fail with [`StateError::Closed`].
#[derive(Debug)]
pub struct ProfileStore {
    connection: Connection,
    buckets: RecordSpace<Bucket>,
    objects: RecordSpace<StorageObject>,
    profiles: RecordSpace<Profile>,
    current: Observable<Option<Profile>>,
}

impl ProfileStore {
    /// Build a store from configuration. Nothing is opened until first use.
    pub fn new(config: &StateConfig) -> Self {
        Self::with_connector(config.backend.connector(), config.channel_capacity)
    }

    /// Build a store over an explicit connector.
    pub fn with_connector(connector: Arc<dyn Connector>, capacity: usize) -> Self {
        Self {
            connection: Connection::new(connector),
            buckets: RecordSpace::new(capacity),
            objects: RecordSpace::new(capacity),
            profiles: RecordSpace::new(capacity),
            current: Observable::new(None, capacity),
        }
    }

    /// Open the backend now rather than on first use.
    pub async fn connect(&self) -> StateResult<()> {
        self.connection
            .get()
            .await
            .map(|_| ())
            .map_err(StateError::from_backend)
    }

    /// Release the backend connection.
    pub async fn close(&self) {
        self.connection.close().await;
        info!("profile store closed");
    }

    // ---- Loads ----

    pub async fn load_buckets(&self) -> StateResult<usize> {
        self.buckets.load(&self.connection).await
    }

    pub async fn load_objects(&self) -> StateResult<usize> {
        self.objects.load(&self.connection).await
    }

    pub async fn load_profiles(&self) -> StateResult<usize> {
        self.profiles.load(&self.connection).await
    }

    /// Load all three collections. The kinds load concurrently.
    pub async fn load_all(&self) -> StateResult<()> {
        let (buckets, objects, profiles) =
            tokio::try_join!(self.load_buckets(), self.load_objects(), self.load_profiles())?;
        debug!(buckets, objects, profiles, "all collections loaded");
        Ok(())
    }

    // ---- Adds ----

    pub async fn add_bucket(&self, bucket: Bucket) -> StateResult<()> {
        self.buckets.add(&self.connection, bucket).await
    }

    pub async fn add_object(&self, object: StorageObject) -> StateResult<()> {
        self.objects.add(&self.connection, object).await
    }

    pub async fn add_profile(&self, profile: Profile) -> StateResult<()> {
        self.profiles.add(&self.connection, profile).await
    }

    // ---- Profiles ----

    /// Delete a profile by name. Deleting a missing profile is a no-op.
    ///
    /// The current-profile selection is not cleared, even if it names the
    /// deleted profile; see [`resolve_current_profile`](Self::resolve_current_profile).
    pub async fn delete_profile(&self, name: &str) -> StateResult<bool> {
        self.profiles.delete(&self.connection, name).await
    }

    /// Select a profile, or clear the selection. Never touches the backend.
    pub fn set_current_profile(&self, profile: Option<Profile>) {
        match &profile {
            Some(p) => debug!(name = %p.name, "current profile selected"),
            None => debug!("current profile cleared"),
        }
        self.current.set(profile);
    }

    /// The selected profile exactly as it was set.
    pub fn current_profile(&self) -> Option<Profile> {
        self.current.get()
    }

    /// The selected profile, looked up by name in the profile collection.
    ///
    /// Returns `None` if nothing is selected or the selected profile is no
    /// longer in the collection.
    pub fn resolve_current_profile(&self) -> Option<Profile> {
        let name = self.current.with(|p| p.as_ref().map(|p| p.name.clone()))?;
        self.profiles
            .records()
            .with(|profiles| profiles.iter().find(|p| p.name == name).cloned())
    }

    // ---- Observables ----

    pub fn buckets(&self) -> &Observable<Vec<Bucket>> {
        self.buckets.records()
    }

    pub fn objects(&self) -> &Observable<Vec<StorageObject>> {
        self.objects.records()
    }

    pub fn profiles(&self) -> &Observable<Vec<Profile>> {
        self.profiles.records()
    }

    pub fn current(&self) -> &Observable<Option<Profile>> {
        &self.current
    }

    /// Number of records mirrored for a kind.
    pub fn len(&self, kind: RecordKind) -> usize {
        match kind {
            RecordKind::Bucket => self.buckets().len(),
            RecordKind::Object => self.objects().len(),
            RecordKind::Profile => self.profiles().len(),
        }
    }
}
