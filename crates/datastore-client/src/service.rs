use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use datastore_memory::InMemoryDatastore;
use datastore_rpc::{
    AllocateIdsRequest, CommitRequest, CommitResponse, DatastoreRpc, LookupRequest, Mutation,
};
use datastore_types::{Entity, EntityKey, Key, PartialKey};

use crate::batch::BatchWriter;
use crate::error::{DatastoreError, DatastoreResult};
use crate::key_builder::ServiceKeyBuilder;
use crate::options::DatastoreServiceOptions;

/// Client entry point: CRUD and id allocation against one dataset.
///
/// Every call is validated locally (key structure, dataset membership,
/// duplicate keys) before a single request goes to the collaborator.
/// Writes within one call are all-or-nothing.
pub struct DatastoreService<R> {
    options: Arc<DatastoreServiceOptions>,
    rpc: R,
}

impl DatastoreService<InMemoryDatastore> {
    /// A service backed by a fresh in-process store.
    pub fn in_memory(options: impl Into<Arc<DatastoreServiceOptions>>) -> Self {
        Self::new(options, InMemoryDatastore::new())
    }
}

impl<R: DatastoreRpc> DatastoreService<R> {
    pub fn new(options: impl Into<Arc<DatastoreServiceOptions>>, rpc: R) -> Self {
        let options = options.into();
        debug!(
            dataset = options.dataset(),
            host = options.host(),
            namespace = options.namespace().unwrap_or_default(),
            "datastore service created"
        );
        Self { options, rpc }
    }

    /// The options instance this service was created with.
    pub fn options(&self) -> &Arc<DatastoreServiceOptions> {
        &self.options
    }

    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    /// A key builder for `kind` in the configured dataset and namespace.
    pub fn new_key_builder(&self, kind: impl Into<String>) -> ServiceKeyBuilder<'_, R> {
        ServiceKeyBuilder::new(self, kind)
    }

    /// Start an atomic batch of writes.
    pub fn new_batch_writer(&self) -> BatchWriter<'_, R> {
        BatchWriter::new(self)
    }

    // ---- Key allocation ----

    /// Allocate one fresh id on the path of `key`.
    ///
    /// A complete key is treated as its partial key; the result never
    /// carries the input's own id.
    pub fn allocate_id<K: EntityKey>(&self, key: &K) -> DatastoreResult<Key> {
        self.allocate_ids(std::slice::from_ref(key))?
            .pop()
            .ok_or_else(|| DatastoreError::Internal("no id allocated".into()))
    }

    /// Allocate one fresh id per input, in input order.
    pub fn allocate_ids<K: EntityKey>(&self, keys: &[K]) -> DatastoreResult<Vec<Key>> {
        let paths: Vec<PartialKey> = keys.iter().map(|k| k.as_ref().clone()).collect();
        for path in &paths {
            self.check_key(path)?;
        }
        let mut allocated = self.request_ids(paths.clone())?;

        let clashes: Vec<usize> = keys
            .iter()
            .zip(&allocated)
            .enumerate()
            .filter(|(_, (input, out))| input.identity() == Some(out.key_id()))
            .map(|(i, _)| i)
            .collect();
        if !clashes.is_empty() {
            let retry = self.request_ids(clashes.iter().map(|&i| paths[i].clone()).collect())?;
            for (i, key) in clashes.into_iter().zip(retry) {
                if keys[i].identity() == Some(key.key_id()) {
                    return Err(DatastoreError::Internal(format!(
                        "allocation returned the input key {key}"
                    )));
                }
                allocated[i] = key;
            }
        }
        Ok(allocated)
    }

    fn request_ids(&self, paths: Vec<PartialKey>) -> DatastoreResult<Vec<Key>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let response = self.rpc.allocate_ids(AllocateIdsRequest {
            keys: paths.clone(),
        })?;
        if response.keys.len() != paths.len() {
            return Err(DatastoreError::Internal(format!(
                "requested {} ids, received {}",
                paths.len(),
                response.keys.len()
            )));
        }
        for (path, key) in paths.iter().zip(&response.keys) {
            if key.partial_key() != path || !key.has_id() {
                return Err(DatastoreError::Internal(format!(
                    "allocated key {key} does not complete {path}"
                )));
            }
        }
        debug!(count = paths.len(), "allocated ids");
        Ok(response.keys)
    }

    // ---- Reads ----

    /// Look up `keys`, one result slot per key in request order.
    ///
    /// Missing entities come back as `None`; duplicate keys are answered
    /// once per occurrence.
    pub fn get(&self, keys: &[Key]) -> DatastoreResult<Vec<Option<Entity>>> {
        for key in keys {
            self.check_complete_key(key)?;
        }
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let response = self.rpc.lookup(LookupRequest {
            keys: keys.to_vec(),
        })?;
        if response.results.len() != keys.len() {
            return Err(DatastoreError::Internal(format!(
                "requested {} keys, received {} results",
                keys.len(),
                response.results.len()
            )));
        }
        for (key, slot) in keys.iter().zip(&response.results) {
            if let Some(entity) = slot {
                if entity.key() != key {
                    return Err(DatastoreError::Internal(format!(
                        "lookup of {key} returned {}",
                        entity.key()
                    )));
                }
            }
        }
        debug!(
            requested = keys.len(),
            found = response.results.iter().filter(|r| r.is_some()).count(),
            "get"
        );
        Ok(response.results)
    }

    pub fn get_one(&self, key: &Key) -> DatastoreResult<Option<Entity>> {
        Ok(self.get(std::slice::from_ref(key))?.pop().flatten())
    }

    // ---- Writes ----

    /// Insert entities whose keys must all be unoccupied.
    ///
    /// Fails with [`DatastoreError::AlreadyExists`] naming the occupied keys;
    /// nothing is written in that case.
    pub fn add(&self, entities: &[Entity]) -> DatastoreResult<()> {
        let mutations = self.write_mutations(entities, Mutation::Insert)?;
        self.commit("add", mutations)
    }

    /// Replace entities whose keys must all be occupied.
    ///
    /// The stored property set is replaced, not merged.
    pub fn update(&self, entities: &[Entity]) -> DatastoreResult<()> {
        let mutations = self.write_mutations(entities, Mutation::Update)?;
        self.commit("update", mutations)
    }

    /// Insert or replace, regardless of what is stored.
    pub fn put(&self, entities: &[Entity]) -> DatastoreResult<()> {
        let mutations = self.write_mutations(entities, Mutation::Upsert)?;
        self.commit("put", mutations)
    }

    /// Remove whatever is stored under `keys`. Absent keys are ignored.
    pub fn delete(&self, keys: &[Key]) -> DatastoreResult<()> {
        let mut seen = HashSet::new();
        let mut mutations = Vec::with_capacity(keys.len());
        for key in keys {
            self.check_complete_key(key)?;
            if seen.insert(key) {
                mutations.push(Mutation::Delete(key.clone()));
            }
        }
        self.commit("delete", mutations)
    }

    // ---- Shared with the batch writer ----

    pub(crate) fn check_key(&self, key: &PartialKey) -> DatastoreResult<()> {
        key.validate()?;
        if key.dataset() != self.options.dataset() {
            return Err(DatastoreError::InvalidArgument(format!(
                "key {key} is outside dataset {}",
                self.options.dataset()
            )));
        }
        Ok(())
    }

    /// Like [`check_key`](Self::check_key), also checking the id or name.
    pub(crate) fn check_complete_key(&self, key: &Key) -> DatastoreResult<()> {
        key.validate()?;
        self.check_key(key.partial_key())
    }

    pub(crate) fn check_entity(&self, entity: &Entity) -> DatastoreResult<()> {
        entity.validate()?;
        self.check_key(entity.key().partial_key())
    }

    fn write_mutations(
        &self,
        entities: &[Entity],
        wrap: fn(Entity) -> Mutation,
    ) -> DatastoreResult<Vec<Mutation>> {
        let mut seen = HashSet::new();
        for entity in entities {
            self.check_entity(entity)?;
            if !seen.insert(entity.key()) {
                return Err(DatastoreError::InvalidArgument(format!(
                    "key {} appears more than once",
                    entity.key()
                )));
            }
        }
        Ok(entities.iter().cloned().map(wrap).collect())
    }

    /// Send one atomic commit and map its outcome.
    pub(crate) fn commit(&self, op: &'static str, mutations: Vec<Mutation>) -> DatastoreResult<()> {
        if mutations.is_empty() {
            return Ok(());
        }
        let sent = mutations.len();
        match self.rpc.commit(CommitRequest { mutations })? {
            CommitResponse::Committed { mutation_count } if mutation_count == sent => {
                debug!(op, mutations = sent, "committed");
                Ok(())
            }
            CommitResponse::Committed { mutation_count } => Err(DatastoreError::Internal(
                format!("{op} sent {sent} mutations, {mutation_count} acknowledged"),
            )),
            CommitResponse::Conflict { keys } => {
                warn!(op, count = keys.len(), "write rejected: keys already exist");
                Err(DatastoreError::AlreadyExists { keys })
            }
            CommitResponse::Missing { keys } => {
                warn!(op, count = keys.len(), "write rejected: keys not found");
                Err(DatastoreError::NotFound { keys })
            }
        }
    }
}

impl<R> std::fmt::Debug for DatastoreService<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatastoreService")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
