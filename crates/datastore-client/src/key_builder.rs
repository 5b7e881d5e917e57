use datastore_rpc::DatastoreRpc;
use datastore_types::{Key, KeyId, PartialKey, PartialKeyBuilder, PathElement};

use crate::error::DatastoreResult;
use crate::service::DatastoreService;

/// Key builder bound to a service: seeded with its dataset and namespace,
/// and able to complete a key with a freshly allocated id.
pub struct ServiceKeyBuilder<'a, R> {
    service: &'a DatastoreService<R>,
    inner: PartialKeyBuilder,
}

impl<'a, R: DatastoreRpc> ServiceKeyBuilder<'a, R> {
    pub(crate) fn new(service: &'a DatastoreService<R>, kind: impl Into<String>) -> Self {
        let options = service.options();
        let mut inner = PartialKeyBuilder::new(options.dataset(), kind);
        if let Some(namespace) = options.namespace() {
            inner = inner.namespace(namespace);
        }
        Self { service, inner }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.inner = self.inner.namespace(namespace);
        self
    }

    pub fn add_ancestor(mut self, kind: impl Into<String>, id: impl Into<KeyId>) -> Self {
        self.inner = self.inner.add_ancestor(kind, id);
        self
    }

    pub fn add_ancestors(mut self, ancestors: impl IntoIterator<Item = PathElement>) -> Self {
        self.inner = self.inner.add_ancestors(ancestors);
        self
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.inner = self.inner.kind(kind);
        self
    }

    pub fn build(&self) -> DatastoreResult<PartialKey> {
        Ok(self.inner.build()?)
    }

    /// Complete the key with a caller-chosen id or name.
    pub fn build_key(&self, id: impl Into<KeyId>) -> DatastoreResult<Key> {
        Ok(self.inner.build_key(id)?)
    }

    /// Complete the key with an id allocated by the datastore.
    pub fn allocate_id_and_build(&self) -> DatastoreResult<Key> {
        let partial = self.build()?;
        self.service.allocate_id(&partial)
    }
}
