//! Record types for bucketdeck.
//!
//! This crate defines the three record shapes that bucketdeck mirrors between
//! its reactive state and a durable key-value store. Every other bucketdeck
//! crate depends on `bucketdeck-types`.
//!
//! # Key Types
//!
//! - [`Bucket`] -- metadata describing a cloud-storage bucket
//! - [`StorageObject`] -- metadata describing an object inside a bucket
//! - [`Profile`] -- connection profile (endpoint, region, credentials)
//! - [`RecordKind`] -- names the key-value space each record kind lives in
//! - [`Record`] -- key extraction, validation, and the JSON encoding contract

pub mod bucket;
pub mod error;
pub mod names;
pub mod object;
pub mod profile;
pub mod record;
pub mod time;

pub use bucket::Bucket;
pub use error::TypeError;
pub use names::{validate_endpoint, validate_record_name};
pub use object::StorageObject;
pub use profile::Profile;
pub use record::{Record, RecordKind};
pub use time::now_millis;
