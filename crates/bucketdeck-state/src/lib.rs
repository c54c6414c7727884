//! Reactive profile, bucket, and object state for bucketdeck.
//!
//! [`ProfileStore`] keeps three observable collections (buckets, objects,
//! profiles) and a current-profile selection. Every add or delete is written
//! through to a [`KvStore`](bucketdeck_store::KvStore) first and mirrored
//! into the collection only once the backend has accepted it, so observers
//! never see a record that was not persisted.
//!
//! # Modules
//!
//! - [`observable`] -- [`Observable`] value holders and their [`Subscription`]s
//! - [`space`] -- [`RecordSpace`], one record kind's mirror and operation queue
//! - [`store`] -- the [`ProfileStore`] itself
//! - [`config`] -- TOML-loadable [`StateConfig`]
//! - [`error`] -- [`StateError`] and [`SubscriptionError`]

pub mod config;
pub mod error;
pub mod observable;
pub mod space;
pub mod store;

pub use config::StateConfig;
pub use error::{StateError, StateResult, SubscriptionError};
pub use observable::{Observable, Subscription};
pub use space::RecordSpace;
pub use store::ProfileStore;

// Types callers need alongside the store.
pub use bucketdeck_store::{BackendConfig, SyncMode};
pub use bucketdeck_types::{Bucket, Profile, RecordKind, StorageObject};
