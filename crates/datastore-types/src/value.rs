use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, PartialEntity};
use crate::key::Key;

/// Payload of a property [`Value`]. One case per supported type.
///
/// Doubles compare by bit pattern, so `NaN` equals itself and `-0.0`
/// differs from `0.0`. A stored value always reads back equal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ValueData {
    Null,
    String(String),
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Timestamp(DateTime<Utc>),
    Key(Key),
    Blob(Vec<u8>),
    PartialEntity(Box<PartialEntity>),
    Entity(Box<Entity>),
    List(Vec<Value>),
}

impl PartialEq for ValueData {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            (Self::Key(a), Self::Key(b)) => a == b,
            (Self::Blob(a), Self::Blob(b)) => a == b,
            (Self::PartialEntity(a), Self::PartialEntity(b)) => a == b,
            (Self::Entity(a), Self::Entity(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            _ => false,
        }
    }
}

/// Discriminant of a [`ValueData`] payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Null,
    String,
    Boolean,
    Integer,
    Double,
    Timestamp,
    Key,
    Blob,
    PartialEntity,
    Entity,
    List,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "Null",
            Self::String => "String",
            Self::Boolean => "Boolean",
            Self::Integer => "Integer",
            Self::Double => "Double",
            Self::Timestamp => "Timestamp",
            Self::Key => "Key",
            Self::Blob => "Blob",
            Self::PartialEntity => "PartialEntity",
            Self::Entity => "Entity",
            Self::List => "List",
        };
        f.write_str(name)
    }
}

/// An immutable, typed property value.
///
/// Every value carries an `indexed` flag (default `true`). Two values are
/// equal when their type, payload and flag all match. Use
/// [`Value::with_indexed`] to derive a copy with a different flag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Value {
    data: ValueData,
    indexed: bool,
}

impl Value {
    pub fn new(data: ValueData) -> Self {
        Self {
            data,
            indexed: true,
        }
    }

    pub fn null() -> Self {
        Self::new(ValueData::Null)
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(ValueData::String(value.into()))
    }

    pub fn boolean(value: bool) -> Self {
        Self::new(ValueData::Boolean(value))
    }

    pub fn integer(value: i64) -> Self {
        Self::new(ValueData::Integer(value))
    }

    pub fn double(value: f64) -> Self {
        Self::new(ValueData::Double(value))
    }

    pub fn timestamp(value: DateTime<Utc>) -> Self {
        Self::new(ValueData::Timestamp(value))
    }

    pub fn key(value: Key) -> Self {
        Self::new(ValueData::Key(value))
    }

    pub fn blob(value: impl Into<Vec<u8>>) -> Self {
        Self::new(ValueData::Blob(value.into()))
    }

    pub fn partial_entity(value: PartialEntity) -> Self {
        Self::new(ValueData::PartialEntity(Box::new(value)))
    }

    pub fn entity(value: Entity) -> Self {
        Self::new(ValueData::Entity(Box::new(value)))
    }

    pub fn list(values: impl IntoIterator<Item = Value>) -> Self {
        Self::new(ValueData::List(values.into_iter().collect()))
    }

    /// A copy of this value with the given `indexed` flag.
    pub fn with_indexed(mut self, indexed: bool) -> Self {
        self.indexed = indexed;
        self
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    pub fn data(&self) -> &ValueData {
        &self.data
    }

    pub fn into_data(self) -> ValueData {
        self.data
    }

    pub fn value_type(&self) -> ValueType {
        match &self.data {
            ValueData::Null => ValueType::Null,
            ValueData::String(_) => ValueType::String,
            ValueData::Boolean(_) => ValueType::Boolean,
            ValueData::Integer(_) => ValueType::Integer,
            ValueData::Double(_) => ValueType::Double,
            ValueData::Timestamp(_) => ValueType::Timestamp,
            ValueData::Key(_) => ValueType::Key,
            ValueData::Blob(_) => ValueType::Blob,
            ValueData::PartialEntity(_) => ValueType::PartialEntity,
            ValueData::Entity(_) => ValueType::Entity,
            ValueData::List(_) => ValueType::List,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.data, ValueData::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.data {
            ValueData::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.data {
            ValueData::Boolean(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self.data {
            ValueData::Integer(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self.data {
            ValueData::Double(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&DateTime<Utc>> {
        match &self.data {
            ValueData::Timestamp(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_key(&self) -> Option<&Key> {
        match &self.data {
            ValueData::Key(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match &self.data {
            ValueData::Blob(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_partial_entity(&self) -> Option<&PartialEntity> {
        match &self.data {
            ValueData::PartialEntity(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match &self.data {
            ValueData::Entity(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match &self.data {
            ValueData::List(values) => Some(values),
            _ => None,
        }
    }
}

impl From<ValueData> for Value {
    fn from(data: ValueData) -> Self {
        Self::new(data)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::string(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::string(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::double(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::timestamp(value)
    }
}

impl From<Key> for Value {
    fn from(value: Key) -> Self {
        Self::key(value)
    }
}

impl From<PartialEntity> for Value {
    fn from(value: PartialEntity) -> Self {
        Self::partial_entity(value)
    }
}

impl From<Entity> for Value {
    fn from(value: Entity) -> Self {
        Self::entity(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Self::list(values)
    }
}
