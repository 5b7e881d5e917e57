use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use datastore_rpc::{
    AllocateIdsRequest, AllocateIdsResponse, CommitRequest, CommitResponse, DatastoreRpc,
    LookupRequest, LookupResponse, Mutation, RpcError, RpcResult,
};
use datastore_types::{Entity, Key, PartialKey};

/// In-memory, `BTreeMap`-based datastore.
///
/// Intended for tests and embedding. All state sits behind one `RwLock`;
/// a commit validates and applies under a single write guard, so readers
/// see either none or all of a batch.
pub struct InMemoryDatastore {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    entities: BTreeMap<Key, Entity>,
    last_id: i64,
}

impl MemoryState {
    /// Next id from the shared counter that is not already taken on `path`.
    fn fresh_key(&mut self, path: &PartialKey) -> RpcResult<Key> {
        loop {
            self.last_id = self
                .last_id
                .checked_add(1)
                .ok_or_else(|| RpcError::Internal("id space exhausted".into()))?;
            let key = path
                .to_key(self.last_id)
                .map_err(|e| RpcError::Internal(e.to_string()))?;
            if !self.entities.contains_key(&key) {
                return Ok(key);
            }
        }
    }
}

impl InMemoryDatastore {
    /// Create a new empty datastore.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
        }
    }

    /// Number of stored entities.
    pub fn len(&self) -> usize {
        self.peek().entities.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.peek().entities.is_empty()
    }

    /// Whether an entity is stored under `key`.
    pub fn contains(&self, key: &Key) -> bool {
        self.peek().entities.contains_key(key)
    }

    /// All stored keys in key order.
    pub fn keys(&self) -> Vec<Key> {
        self.peek().entities.keys().cloned().collect()
    }

    /// Remove every entity. The id counter keeps running.
    pub fn clear(&self) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entities
            .clear();
    }

    /// Read access for the inspection helpers, tolerating poison.
    fn peek(&self) -> RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_state(&self) -> RpcResult<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|e| RpcError::Internal(format!("lock poisoned: {e}")))
    }

    fn write_state(&self) -> RpcResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|e| RpcError::Internal(format!("lock poisoned: {e}")))
    }
}

impl Default for InMemoryDatastore {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(e: impl ToString) -> RpcError {
    RpcError::InvalidRequest(e.to_string())
}

fn validate_mutation(mutation: &Mutation) -> RpcResult<()> {
    match mutation {
        Mutation::Insert(e) | Mutation::Update(e) | Mutation::Upsert(e) => {
            e.validate().map_err(invalid)
        }
        Mutation::Delete(k) => k.validate().map_err(invalid),
    }
}

impl DatastoreRpc for InMemoryDatastore {
    fn allocate_ids(&self, request: AllocateIdsRequest) -> RpcResult<AllocateIdsResponse> {
        for path in &request.keys {
            path.validate().map_err(invalid)?;
        }
        let mut state = self.write_state()?;
        let keys = request
            .keys
            .iter()
            .map(|path| state.fresh_key(path))
            .collect::<RpcResult<Vec<_>>>()?;
        debug!(count = keys.len(), last_id = state.last_id, "allocated ids");
        Ok(AllocateIdsResponse { keys })
    }

    fn lookup(&self, request: LookupRequest) -> RpcResult<LookupResponse> {
        for key in &request.keys {
            key.validate().map_err(invalid)?;
        }
        let state = self.read_state()?;
        let results: Vec<Option<Entity>> = request
            .keys
            .iter()
            .map(|key| state.entities.get(key).cloned())
            .collect();
        debug!(
            requested = results.len(),
            found = results.iter().filter(|r| r.is_some()).count(),
            "lookup"
        );
        Ok(LookupResponse { results })
    }

    fn commit(&self, request: CommitRequest) -> RpcResult<CommitResponse> {
        request.mutations.iter().try_for_each(validate_mutation)?;
        let mutation_count = request.mutations.len();

        let mut state = self.write_state()?;

        // Stage every mutation against the store as modified by the earlier
        // mutations of the same batch; nothing touches `state` until all pass.
        let mut staged: BTreeMap<Key, Option<Entity>> = BTreeMap::new();
        let mut conflicts = Vec::new();
        let mut missing = Vec::new();
        for mutation in request.mutations {
            let key = mutation.key().clone();
            let exists = match staged.get(&key) {
                Some(slot) => slot.is_some(),
                None => state.entities.contains_key(&key),
            };
            match mutation {
                Mutation::Insert(_) if exists => conflicts.push(key),
                Mutation::Update(_) if !exists => missing.push(key),
                Mutation::Insert(entity) | Mutation::Update(entity) | Mutation::Upsert(entity) => {
                    staged.insert(key, Some(entity));
                }
                Mutation::Delete(_) => {
                    staged.insert(key, None);
                }
            }
        }

        if !conflicts.is_empty() {
            warn!(count = conflicts.len(), "commit rejected: keys already exist");
            return Ok(CommitResponse::Conflict { keys: conflicts });
        }
        if !missing.is_empty() {
            warn!(count = missing.len(), "commit rejected: keys not found");
            return Ok(CommitResponse::Missing { keys: missing });
        }

        for (key, slot) in staged {
            match slot {
                Some(entity) => {
                    state.entities.insert(key, entity);
                }
                None => {
                    state.entities.remove(&key);
                }
            }
        }
        debug!(mutations = mutation_count, stored = state.entities.len(), "commit applied");
        Ok(CommitResponse::Committed { mutation_count })
    }
}

impl std::fmt::Debug for InMemoryDatastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryDatastore")
            .field("entity_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datastore_types::{EntityBuilder, KeyBuilder, PartialKeyBuilder, Value};

    const DATASET: &str = "dataset1";

    fn path(kind: &str) -> PartialKey {
        PartialKeyBuilder::new(DATASET, kind).build().unwrap()
    }

    fn key(name: &str) -> Key {
        KeyBuilder::new(DATASET, "kind1", name).build().unwrap()
    }

    fn entity(name: &str, n: i64) -> Entity {
        EntityBuilder::new(key(name))
            .set_property("n", n)
            .build()
            .unwrap()
    }

    fn commit(store: &InMemoryDatastore, mutations: Vec<Mutation>) -> CommitResponse {
        store.commit(CommitRequest { mutations }).unwrap()
    }

    fn get(store: &InMemoryDatastore, keys: &[Key]) -> Vec<Option<Entity>> {
        store
            .lookup(LookupRequest {
                keys: keys.to_vec(),
            })
            .unwrap()
            .results
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    #[test]
    fn lookup_is_positional() {
        let store = InMemoryDatastore::new();
        commit(&store, vec![Mutation::Insert(entity("a", 1)), Mutation::Insert(entity("c", 3))]);

        let results = get(&store, &[key("a"), key("b"), key("c"), key("a")]);
        assert_eq!(
            results,
            vec![Some(entity("a", 1)), None, Some(entity("c", 3)), Some(entity("a", 1))]
        );
    }

    #[test]
    fn lookup_rejects_invalid_keys() {
        let store = InMemoryDatastore::new();
        let bad: Key = serde_json::from_str(
            r#"{"partial":{"dataset":"","namespace":null,"ancestors":[],"kind":"k"},"id":{"Id":1}}"#,
        )
        .unwrap();
        let err = store.lookup(LookupRequest { keys: vec![bad] }).unwrap_err();
        assert!(matches!(err, RpcError::InvalidRequest(_)));
    }

    // -----------------------------------------------------------------------
    // Commit semantics
    // -----------------------------------------------------------------------

    #[test]
    fn insert_conflict_applies_nothing() {
        let store = InMemoryDatastore::new();
        commit(&store, vec![Mutation::Insert(entity("a", 1))]);

        let response = commit(
            &store,
            vec![Mutation::Insert(entity("b", 2)), Mutation::Insert(entity("a", 9))],
        );
        assert_eq!(response, CommitResponse::Conflict { keys: vec![key("a")] });
        assert!(!store.contains(&key("b")));
        assert_eq!(get(&store, &[key("a")]), vec![Some(entity("a", 1))]);
    }

    #[test]
    fn update_missing_applies_nothing() {
        let store = InMemoryDatastore::new();
        commit(&store, vec![Mutation::Insert(entity("a", 1))]);

        let response = commit(
            &store,
            vec![Mutation::Update(entity("a", 2)), Mutation::Update(entity("z", 0))],
        );
        assert_eq!(response, CommitResponse::Missing { keys: vec![key("z")] });
        assert_eq!(get(&store, &[key("a")]), vec![Some(entity("a", 1))]);
    }

    #[test]
    fn update_replaces_whole_property_set() {
        let store = InMemoryDatastore::new();
        let original = entity("a", 1).builder().set_property("extra", true).build().unwrap();
        commit(&store, vec![Mutation::Insert(original)]);

        let replacement = EntityBuilder::new(key("a"))
            .set_property("bla", Value::null())
            .build()
            .unwrap();
        commit(&store, vec![Mutation::Update(replacement.clone())]);
        let stored = get(&store, &[key("a")]).remove(0).unwrap();
        assert_eq!(stored, replacement);
        assert!(!stored.has_property("extra"));
    }

    #[test]
    fn upsert_creates_and_replaces() {
        let store = InMemoryDatastore::new();
        let response = commit(&store, vec![Mutation::Upsert(entity("a", 1))]);
        assert_eq!(response, CommitResponse::Committed { mutation_count: 1 });
        commit(&store, vec![Mutation::Upsert(entity("a", 2))]);
        commit(&store, vec![Mutation::Upsert(entity("a", 2))]);
        assert_eq!(store.len(), 1);
        assert_eq!(get(&store, &[key("a")]), vec![Some(entity("a", 2))]);
    }

    #[test]
    fn delete_is_idempotent() {
        let store = InMemoryDatastore::new();
        commit(&store, vec![Mutation::Insert(entity("a", 1))]);
        commit(&store, vec![Mutation::Delete(key("a")), Mutation::Delete(key("ghost"))]);
        commit(&store, vec![Mutation::Delete(key("a"))]);
        assert!(store.is_empty());
    }

    #[test]
    fn later_mutations_see_earlier_ones() {
        let store = InMemoryDatastore::new();
        let response = commit(
            &store,
            vec![
                Mutation::Insert(entity("a", 1)),
                Mutation::Update(entity("a", 2)),
                Mutation::Delete(key("a")),
                Mutation::Insert(entity("a", 3)),
            ],
        );
        assert!(response.is_committed());
        assert_eq!(get(&store, &[key("a")]), vec![Some(entity("a", 3))]);
    }

    #[test]
    fn duplicate_insert_in_one_batch_conflicts() {
        let store = InMemoryDatastore::new();
        let response = commit(
            &store,
            vec![Mutation::Insert(entity("a", 1)), Mutation::Insert(entity("a", 2))],
        );
        assert_eq!(response, CommitResponse::Conflict { keys: vec![key("a")] });
        assert!(store.is_empty());
    }

    #[test]
    fn conflict_reported_before_missing() {
        let store = InMemoryDatastore::new();
        commit(&store, vec![Mutation::Insert(entity("a", 1))]);
        let response = commit(
            &store,
            vec![Mutation::Update(entity("z", 0)), Mutation::Insert(entity("a", 1))],
        );
        assert!(matches!(response, CommitResponse::Conflict { .. }));
    }

    // -----------------------------------------------------------------------
    // Id allocation
    // -----------------------------------------------------------------------

    #[test]
    fn allocated_ids_are_fresh_and_ordered() {
        let store = InMemoryDatastore::new();
        let child = PartialKeyBuilder::new(DATASET, "kind2")
            .add_ancestor("kind1", 10i64)
            .build()
            .unwrap();
        let response = store
            .allocate_ids(AllocateIdsRequest {
                keys: vec![path("kind1"), child.clone(), path("kind1")],
            })
            .unwrap();
        assert_eq!(response.keys.len(), 3);
        assert_eq!(response.keys[0].partial_key(), &path("kind1"));
        assert_eq!(response.keys[1].partial_key(), &child);
        assert_ne!(response.keys[0], response.keys[2]);
        assert!(response.keys.iter().all(Key::has_id));
    }

    #[test]
    fn allocation_skips_ids_in_use() {
        let store = InMemoryDatastore::new();
        let taken = path("kind1").to_key(1i64).unwrap();
        let taken_entity = EntityBuilder::new(taken.clone()).build().unwrap();
        commit(&store, vec![Mutation::Insert(taken_entity)]);

        let response = store
            .allocate_ids(AllocateIdsRequest {
                keys: vec![path("kind1")],
            })
            .unwrap();
        assert_ne!(response.keys[0], taken);
    }

    #[test]
    fn allocation_rejects_invalid_path() {
        let store = InMemoryDatastore::new();
        let bad: PartialKey = serde_json::from_str(
            r#"{"dataset":"d","namespace":null,"ancestors":[],"kind":""}"#,
        )
        .unwrap();
        let err = store
            .allocate_ids(AllocateIdsRequest { keys: vec![bad] })
            .unwrap_err();
        assert!(matches!(err, RpcError::InvalidRequest(_)));
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_allocations_never_collide() {
        use std::collections::HashSet;
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryDatastore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store
                        .allocate_ids(AllocateIdsRequest {
                            keys: vec![path("kind1"); 16],
                        })
                        .unwrap()
                        .keys
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for h in handles {
            for key in h.join().expect("thread should not panic") {
                assert!(seen.insert(key), "duplicate allocation");
            }
        }
        assert_eq!(seen.len(), 128);
    }

    // -----------------------------------------------------------------------
    // Utility methods
    // -----------------------------------------------------------------------

    #[test]
    fn clear_keeps_counter_running() {
        let store = InMemoryDatastore::new();
        let first = store
            .allocate_ids(AllocateIdsRequest { keys: vec![path("k")] })
            .unwrap()
            .keys;
        commit(&store, vec![Mutation::Insert(entity("a", 1))]);
        store.clear();
        assert!(store.is_empty());
        let second = store
            .allocate_ids(AllocateIdsRequest { keys: vec![path("k")] })
            .unwrap()
            .keys;
        assert_ne!(first, second);
    }

    #[test]
    fn keys_are_sorted() {
        let store = InMemoryDatastore::new();
        commit(
            &store,
            vec![
                Mutation::Upsert(entity("c", 0)),
                Mutation::Upsert(entity("a", 0)),
                Mutation::Upsert(entity("b", 0)),
            ],
        );
        assert_eq!(store.keys(), vec![key("a"), key("b"), key("c")]);
    }

    #[test]
    fn debug_format() {
        let store = InMemoryDatastore::default();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryDatastore"));
        assert!(debug.contains("entity_count"));
    }
}
