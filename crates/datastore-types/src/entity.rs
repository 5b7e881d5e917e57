use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};
use crate::key::{Key, KeyId, PartialKey};
use crate::value::{Value, ValueData};

/// Key types an entity can be attached to.
pub trait EntityKey: Clone + fmt::Debug + PartialEq + AsRef<PartialKey> {
    /// Structural validation of the key itself.
    fn validate_key(&self) -> TypeResult<()>;

    /// The completing id or name, `None` for partial keys.
    fn identity(&self) -> Option<&KeyId>;
}

impl EntityKey for PartialKey {
    fn validate_key(&self) -> TypeResult<()> {
        self.validate()
    }

    fn identity(&self) -> Option<&KeyId> {
        None
    }
}

impl EntityKey for Key {
    fn validate_key(&self) -> TypeResult<()> {
        self.validate()
    }

    fn identity(&self) -> Option<&KeyId> {
        Some(self.key_id())
    }
}

/// A key plus a map of named property values.
///
/// Immutable once built. Property order plays no part in equality; nested
/// entity values are compared recursively. To change anything, derive a
/// new value through [`BaseEntity::builder`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaseEntity<K> {
    key: K,
    properties: BTreeMap<String, Value>,
}

/// An entity with a complete key, as stored by the datastore.
pub type Entity = BaseEntity<Key>;

/// An entity whose key has no identity yet.
pub type PartialEntity = BaseEntity<PartialKey>;

impl<K: EntityKey> BaseEntity<K> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Property names in lexical order.
    pub fn property_names(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.properties.keys().map(String::as_str)
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// A builder seeded with this entity's key and properties.
    pub fn builder(&self) -> EntityBuilder<K> {
        EntityBuilder::with_base(self.key.clone(), self)
    }

    /// Validate the key, every property name, and every nested value.
    pub fn validate(&self) -> TypeResult<()> {
        self.key.validate_key()?;
        for (name, value) in &self.properties {
            if name.is_empty() {
                return Err(TypeError::EmptyPropertyName);
            }
            validate_value(value)?;
        }
        Ok(())
    }
}

fn validate_value(value: &Value) -> TypeResult<()> {
    match value.data() {
        ValueData::Key(key) => key.validate(),
        ValueData::PartialEntity(entity) => entity.validate(),
        ValueData::Entity(entity) => entity.validate(),
        ValueData::List(values) => values.iter().try_for_each(validate_value),
        ValueData::Null
        | ValueData::String(_)
        | ValueData::Boolean(_)
        | ValueData::Integer(_)
        | ValueData::Double(_)
        | ValueData::Timestamp(_)
        | ValueData::Blob(_) => Ok(()),
    }
}

/// Copy-on-write builder for [`Entity`] and [`PartialEntity`].
///
/// Starting from a base copies its property map; the base itself is never
/// touched, so any number of builders may be derived from one entity.
#[derive(Clone, Debug)]
pub struct EntityBuilder<K> {
    key: K,
    properties: BTreeMap<String, Value>,
}

impl<K: EntityKey> EntityBuilder<K> {
    /// An empty entity for `key`.
    pub fn new(key: K) -> Self {
        Self {
            key,
            properties: BTreeMap::new(),
        }
    }

    /// An entity for `key` that starts with a copy of `base`'s properties.
    pub fn with_base<B: EntityKey>(key: K, base: &BaseEntity<B>) -> Self {
        Self {
            key,
            properties: base.properties.clone(),
        }
    }

    /// Re-target the entity at a different key.
    pub fn key(mut self, key: K) -> Self {
        self.key = key;
        self
    }

    /// Insert or replace a property.
    pub fn set_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn set_properties<N, V>(mut self, properties: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<String>,
        V: Into<Value>,
    {
        self.properties
            .extend(properties.into_iter().map(|(n, v)| (n.into(), v.into())));
        self
    }

    /// Drop a property. Absent names are ignored.
    pub fn remove_property(mut self, name: &str) -> Self {
        self.properties.remove(name);
        self
    }

    pub fn clear_properties(mut self) -> Self {
        self.properties.clear();
        self
    }

    pub fn build(self) -> TypeResult<BaseEntity<K>> {
        let entity = BaseEntity {
            key: self.key,
            properties: self.properties,
        };
        entity.validate()?;
        Ok(entity)
    }
}
