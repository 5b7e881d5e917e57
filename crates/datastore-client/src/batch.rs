use std::collections::HashMap;

use datastore_rpc::{DatastoreRpc, Mutation};
use datastore_types::{Entity, Key};

use crate::error::{DatastoreError, DatastoreResult};
use crate::service::DatastoreService;

/// Collects writes and submits them as one atomic commit.
///
/// Each key may be written once per batch. Repeated deletes of one key
/// collapse into a single delete; any other repetition fails the submit
/// with `InvalidArgument`. Dropping the writer discards the batch.
pub struct BatchWriter<'a, R> {
    service: &'a DatastoreService<R>,
    /// Queued mutations, each tagged with the writer method that queued it.
    mutations: Vec<(&'static str, Mutation)>,
}

impl<'a, R: DatastoreRpc> BatchWriter<'a, R> {
    pub(crate) fn new(service: &'a DatastoreService<R>) -> Self {
        Self {
            service,
            mutations: Vec::new(),
        }
    }

    pub fn add(&mut self, entity: Entity) -> &mut Self {
        self.mutations.push(("add", Mutation::Insert(entity)));
        self
    }

    pub fn update(&mut self, entity: Entity) -> &mut Self {
        self.mutations.push(("update", Mutation::Update(entity)));
        self
    }

    pub fn put(&mut self, entity: Entity) -> &mut Self {
        self.mutations.push(("put", Mutation::Upsert(entity)));
        self
    }

    pub fn delete(&mut self, key: Key) -> &mut Self {
        self.mutations.push(("delete", Mutation::Delete(key)));
        self
    }

    /// Number of queued mutations.
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Validate the batch and commit it. Nothing is written unless every
    /// mutation applies.
    pub fn submit(self) -> DatastoreResult<()> {
        let mut seen: HashMap<Key, &'static str> = HashMap::new();
        let mut mutations = Vec::with_capacity(self.mutations.len());
        for (op, mutation) in self.mutations {
            match &mutation {
                Mutation::Delete(key) => self.service.check_complete_key(key)?,
                Mutation::Insert(e) | Mutation::Update(e) | Mutation::Upsert(e) => {
                    self.service.check_entity(e)?
                }
            }
            let is_delete = matches!(mutation, Mutation::Delete(_));
            match seen.get(mutation.key()) {
                Some(&previous) if is_delete && previous == "delete" => continue,
                Some(&previous) => {
                    return Err(DatastoreError::InvalidArgument(format!(
                        "key {} used by both {previous} and {op} in one batch",
                        mutation.key()
                    )));
                }
                None => {
                    seen.insert(mutation.key().clone(), op);
                }
            }
            mutations.push(mutation);
        }
        self.service.commit("batch", mutations)
    }
}
