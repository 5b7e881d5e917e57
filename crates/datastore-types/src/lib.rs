//! Data model for the entity datastore client.
//!
//! Everything here is an immutable value with structural equality. Builders
//! are the only way to produce or "modify" a value; they always yield a new
//! instance and never touch the one they started from.
//!
//! # Key Types
//!
//! - [`PartialKey`] -- dataset, namespace, ancestor path and kind, no identity
//! - [`Key`] -- a `PartialKey` completed with exactly one id or name
//! - [`Value`] -- a typed property value with an `indexed` flag
//! - [`Entity`] / [`PartialEntity`] -- a key plus named property values

pub mod entity;
pub mod error;
pub mod key;
pub mod value;

pub use entity::{BaseEntity, Entity, EntityBuilder, EntityKey, PartialEntity};
pub use error::{TypeError, TypeResult};
pub use key::{Key, KeyBuilder, KeyId, PartialKey, PartialKeyBuilder, PathElement};
pub use value::{Value, ValueData, ValueType};
