//! In-memory datastore backend.
//!
//! [`InMemoryDatastore`] plays the remote side of [`datastore_rpc::DatastoreRpc`]
//! inside the current process. It is what tests and embedded callers talk to
//! when there is no real datastore around.
//!
//! # Behaviour
//!
//! 1. `lookup` answers positionally, one slot per requested key.
//! 2. `commit` is all-or-nothing: inserts need an empty slot, updates an
//!    occupied one, upserts and deletes always apply.
//! 3. Later mutations in a batch observe earlier ones.
//! 4. `allocate_ids` hands out ids from one process-wide counter, skipping
//!    any id already stored on the requested path.
//! 5. Malformed keys or entities are rejected with `InvalidRequest`.

pub mod memory;

pub use memory::InMemoryDatastore;
