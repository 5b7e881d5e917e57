use datastore_types::{Entity, Key, PartialKey};
use serde::{Deserialize, Serialize};

pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Ask for one fresh id per partial key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AllocateIdsRequest {
    pub keys: Vec<PartialKey>,
}

/// Completed keys, aligned with the request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AllocateIdsResponse {
    pub keys: Vec<Key>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LookupRequest {
    pub keys: Vec<Key>,
}

/// One slot per requested key, `None` where nothing is stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LookupResponse {
    pub results: Vec<Option<Entity>>,
}

/// A single write inside a commit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Mutation {
    /// Create; the key must be unoccupied.
    Insert(Entity),
    /// Replace; the key must be occupied.
    Update(Entity),
    /// Create or replace.
    Upsert(Entity),
    /// Remove if present.
    Delete(Key),
}

impl Mutation {
    pub fn key(&self) -> &Key {
        match self {
            Self::Insert(e) | Self::Update(e) | Self::Upsert(e) => e.key(),
            Self::Delete(k) => k,
        }
    }
}

/// An all-or-nothing batch of mutations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitRequest {
    pub mutations: Vec<Mutation>,
}

/// Outcome of a commit. Only `Committed` means anything was written.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CommitResponse {
    Committed { mutation_count: usize },
    /// Inserts hit occupied keys.
    Conflict { keys: Vec<Key> },
    /// Updates hit unoccupied keys.
    Missing { keys: Vec<Key> },
}

impl CommitResponse {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// Every frame that can cross the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RpcMessage {
    AllocateIdsRequest(AllocateIdsRequest),
    AllocateIdsResponse(AllocateIdsResponse),
    LookupRequest(LookupRequest),
    LookupResponse(LookupResponse),
    CommitRequest(CommitRequest),
    CommitResponse(CommitResponse),
    Error { code: u32, message: String },
}

impl RpcMessage {
    pub fn type_tag(&self) -> u8 {
        match self {
            Self::AllocateIdsRequest(_) => 1,
            Self::AllocateIdsResponse(_) => 2,
            Self::LookupRequest(_) => 3,
            Self::LookupResponse(_) => 4,
            Self::CommitRequest(_) => 5,
            Self::CommitResponse(_) => 6,
            Self::Error { .. } => 255,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::AllocateIdsRequest(_) => "AllocateIdsRequest",
            Self::AllocateIdsResponse(_) => "AllocateIdsResponse",
            Self::LookupRequest(_) => "LookupRequest",
            Self::LookupResponse(_) => "LookupResponse",
            Self::CommitRequest(_) => "CommitRequest",
            Self::CommitResponse(_) => "CommitResponse",
            Self::Error { .. } => "Error",
        }
    }
}
