//! Key-value persistence for bucketdeck.
//!
//! The store is organised into named spaces (`buckets`, `objects`,
//! `profiles`), each a map from a string key to opaque bytes. The store never
//! interprets values; encoding records is the caller's concern.
//!
//! # Backends
//!
//! All backends implement the [`KvStore`] trait:
//!
//! - [`InMemoryKvStore`] -- `HashMap`-based store for tests and embedding
//! - [`LogKvStore`] -- durable store with one CRC-framed append log per space
//!
//! A [`Connector`] opens a backend, and a [`Connection`] makes sure that
//! happens exactly once no matter how many callers race to use it.
//!
//! # Design Rules
//!
//! 1. `add` never overwrites: an existing key fails with `DuplicateKey`.
//! 2. `delete` of a missing key is not an error.
//! 3. `get_all` returns entries in ascending key order.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod config;
pub mod connection;
pub mod error;
pub mod log;
pub mod memory;
pub mod traits;

pub use config::{BackendConfig, SyncMode};
pub use connection::Connection;
pub use error::{StoreError, StoreResult};
pub use log::{LogConnector, LogKvStore};
pub use memory::{InMemoryKvStore, MemoryConnector};
pub use traits::{Connector, KvStore};
