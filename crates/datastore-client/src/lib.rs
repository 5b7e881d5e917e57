//! Client for the hierarchical entity datastore.
//!
//! [`DatastoreService`] is the entry point. It validates keys and entities
//! locally, then talks to any [`DatastoreRpc`] collaborator: the in-process
//! [`InMemoryDatastore`], or the same store behind [`FramedRpc`] so every
//! call crosses the wire codec.
//!
//! ```no_run
//! use datastore_client::{DatastoreService, DatastoreServiceOptions, EntityBuilder};
//!
//! # fn main() -> datastore_client::DatastoreResult<()> {
//! let options = DatastoreServiceOptions::builder("my-dataset").build()?;
//! let service = DatastoreService::in_memory(options);
//!
//! let key = service.new_key_builder("Task").allocate_id_and_build()?;
//! let task = EntityBuilder::new(key.clone())
//!     .set_property("done", false)
//!     .build()?;
//! service.add(&[task])?;
//! assert!(service.get_one(&key)?.is_some());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod error;
pub mod key_builder;
pub mod options;
pub mod service;

pub use batch::BatchWriter;
pub use error::{DatastoreError, DatastoreResult};
pub use key_builder::ServiceKeyBuilder;
pub use options::{DatastoreServiceOptions, DatastoreServiceOptionsBuilder};
pub use service::DatastoreService;

// Re-export the model and transport so callers need only this crate.
pub use datastore_memory::InMemoryDatastore;
pub use datastore_rpc::{DatastoreRpc, FramedRpc};
pub use datastore_types::{
    Entity, EntityBuilder, Key, KeyBuilder, KeyId, PartialEntity, PartialKey, PartialKeyBuilder,
    Value, ValueData, ValueType,
};
