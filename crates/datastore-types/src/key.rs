use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};

/// The identity that completes a key: a numeric id or a string name.
///
/// Being an enum, a key can never carry both or neither.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyId {
    Id(i64),
    Name(String),
}

impl KeyId {
    /// The numeric id, if this identity is one.
    pub fn id(&self) -> Option<i64> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Name(_) => None,
        }
    }

    /// The string name, if this identity is one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Id(_) => None,
            Self::Name(name) => Some(name),
        }
    }

    fn validate(&self) -> TypeResult<()> {
        match self {
            Self::Id(id) if *id <= 0 => Err(TypeError::InvalidId(*id)),
            Self::Name(name) if name.is_empty() => Err(TypeError::EmptyName),
            _ => Ok(()),
        }
    }
}

impl From<i64> for KeyId {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for KeyId {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for KeyId {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => write!(f, "{name:?}"),
        }
    }
}

/// One `(kind, identity)` segment of an ancestor path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathElement {
    kind: String,
    id: KeyId,
}

impl PathElement {
    pub fn new(kind: impl Into<String>, id: impl Into<KeyId>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn key_id(&self) -> &KeyId {
        &self.id
    }

    fn validate(&self) -> TypeResult<()> {
        if self.kind.is_empty() {
            return Err(TypeError::EmptyKind);
        }
        self.id.validate()
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A key without identity: dataset, namespace, ancestor path and kind.
///
/// Describes where a new entity would go. Use [`PartialKey::to_key`] or
/// [`PartialKeyBuilder::build_key`] to complete it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartialKey {
    dataset: String,
    namespace: Option<String>,
    ancestors: Vec<PathElement>,
    kind: String,
}

impl PartialKey {
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Ancestor path, outermost first.
    pub fn ancestors(&self) -> &[PathElement] {
        &self.ancestors
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// A builder pre-populated with every field of this key.
    pub fn builder(&self) -> PartialKeyBuilder {
        PartialKeyBuilder {
            dataset: self.dataset.clone(),
            namespace: self.namespace.clone(),
            ancestors: self.ancestors.clone(),
            kind: self.kind.clone(),
        }
    }

    /// Complete this key with an id or a name. The receiver is unchanged.
    pub fn to_key(&self, id: impl Into<KeyId>) -> TypeResult<Key> {
        let id = id.into();
        id.validate()?;
        Ok(Key {
            partial: self.clone(),
            id,
        })
    }

    /// Check the structural rules every key must satisfy.
    ///
    /// Builders already enforce these; values arriving over the wire do not.
    pub fn validate(&self) -> TypeResult<()> {
        if self.dataset.is_empty() {
            return Err(TypeError::EmptyDataset);
        }
        if self.kind.is_empty() {
            return Err(TypeError::EmptyKind);
        }
        self.ancestors.iter().try_for_each(PathElement::validate)
    }
}

impl AsRef<PartialKey> for PartialKey {
    fn as_ref(&self) -> &PartialKey {
        self
    }
}

impl fmt::Display for PartialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dataset)?;
        if let Some(ns) = &self.namespace {
            write!(f, "/{ns}")?;
        }
        f.write_str(":")?;
        for ancestor in &self.ancestors {
            write!(f, "{ancestor}/")?;
        }
        write!(f, "{}", self.kind)
    }
}

/// A complete key: a [`PartialKey`] plus exactly one id or name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key {
    partial: PartialKey,
    id: KeyId,
}

impl Key {
    pub fn dataset(&self) -> &str {
        self.partial.dataset()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.partial.namespace()
    }

    pub fn ancestors(&self) -> &[PathElement] {
        self.partial.ancestors()
    }

    pub fn kind(&self) -> &str {
        self.partial.kind()
    }

    /// Every field except the identity.
    pub fn partial_key(&self) -> &PartialKey {
        &self.partial
    }

    pub fn into_partial_key(self) -> PartialKey {
        self.partial
    }

    pub fn key_id(&self) -> &KeyId {
        &self.id
    }

    pub fn has_id(&self) -> bool {
        matches!(self.id, KeyId::Id(_))
    }

    pub fn has_name(&self) -> bool {
        matches!(self.id, KeyId::Name(_))
    }

    pub fn id(&self) -> Option<i64> {
        self.id.id()
    }

    pub fn name(&self) -> Option<&str> {
        self.id.name()
    }

    /// A builder pre-populated with every field of this key.
    pub fn builder(&self) -> KeyBuilder {
        KeyBuilder {
            partial: self.partial.builder(),
            id: self.id.clone(),
        }
    }

    /// This key as an ancestor segment for a child key.
    pub fn to_path_element(&self) -> PathElement {
        PathElement {
            kind: self.partial.kind.clone(),
            id: self.id.clone(),
        }
    }

    /// Full path including this key's own element.
    pub fn path(&self) -> Vec<PathElement> {
        let mut path = self.partial.ancestors.clone();
        path.push(self.to_path_element());
        path
    }

    /// The key named by the last ancestor, or `None` for a root key.
    pub fn parent(&self) -> Option<Key> {
        let (last, rest) = self.partial.ancestors.split_last()?;
        Some(Key {
            partial: PartialKey {
                dataset: self.partial.dataset.clone(),
                namespace: self.partial.namespace.clone(),
                ancestors: rest.to_vec(),
                kind: last.kind.clone(),
            },
            id: last.id.clone(),
        })
    }

    pub fn validate(&self) -> TypeResult<()> {
        self.partial.validate()?;
        self.id.validate()
    }
}

impl AsRef<PartialKey> for Key {
    fn as_ref(&self) -> &PartialKey {
        &self.partial
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.partial, self.id)
    }
}

/// Fluent builder for [`PartialKey`].
///
/// Setters consume and return the builder; `build` borrows it, so one builder
/// can produce several keys while it is being adjusted.
#[derive(Clone, Debug)]
pub struct PartialKeyBuilder {
    dataset: String,
    namespace: Option<String>,
    ancestors: Vec<PathElement>,
    kind: String,
}

impl PartialKeyBuilder {
    pub fn new(dataset: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            namespace: None,
            ancestors: Vec::new(),
            kind: kind.into(),
        }
    }

    /// Set the namespace. An empty string selects the default namespace.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.namespace = (!namespace.is_empty()).then_some(namespace);
        self
    }

    /// Append one ancestor after the existing ones.
    pub fn add_ancestor(mut self, kind: impl Into<String>, id: impl Into<KeyId>) -> Self {
        self.ancestors.push(PathElement::new(kind, id));
        self
    }

    pub fn add_ancestors(mut self, ancestors: impl IntoIterator<Item = PathElement>) -> Self {
        self.ancestors.extend(ancestors);
        self
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn build(&self) -> TypeResult<PartialKey> {
        let key = PartialKey {
            dataset: self.dataset.clone(),
            namespace: self.namespace.clone(),
            ancestors: self.ancestors.clone(),
            kind: self.kind.clone(),
        };
        key.validate()?;
        Ok(key)
    }

    /// Shorthand for `build()?.to_key(id)`.
    pub fn build_key(&self, id: impl Into<KeyId>) -> TypeResult<Key> {
        self.build()?.to_key(id)
    }
}

/// Fluent builder for a complete [`Key`].
#[derive(Clone, Debug)]
pub struct KeyBuilder {
    partial: PartialKeyBuilder,
    id: KeyId,
}

impl KeyBuilder {
    pub fn new(
        dataset: impl Into<String>,
        kind: impl Into<String>,
        id: impl Into<KeyId>,
    ) -> Self {
        Self {
            partial: PartialKeyBuilder::new(dataset, kind),
            id: id.into(),
        }
    }

    /// Start a key under `parent`: same dataset and namespace, with the
    /// parent's full path copied in as ancestors.
    pub fn child_of(parent: &Key, kind: impl Into<String>, id: impl Into<KeyId>) -> Self {
        Self {
            partial: PartialKeyBuilder {
                dataset: parent.dataset().to_string(),
                namespace: parent.namespace().map(str::to_string),
                ancestors: parent.path(),
                kind: kind.into(),
            },
            id: id.into(),
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.partial = self.partial.namespace(namespace);
        self
    }

    pub fn add_ancestor(mut self, kind: impl Into<String>, id: impl Into<KeyId>) -> Self {
        self.partial = self.partial.add_ancestor(kind, id);
        self
    }

    pub fn add_ancestors(mut self, ancestors: impl IntoIterator<Item = PathElement>) -> Self {
        self.partial = self.partial.add_ancestors(ancestors);
        self
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.partial = self.partial.kind(kind);
        self
    }

    /// Use a numeric id, replacing any name.
    pub fn id(mut self, id: i64) -> Self {
        self.id = KeyId::Id(id);
        self
    }

    /// Use a string name, replacing any id.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.id = KeyId::Name(name.into());
        self
    }

    pub fn build(&self) -> TypeResult<Key> {
        self.partial.build_key(self.id.clone())
    }
}
