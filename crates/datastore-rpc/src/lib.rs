//! RPC contract between the datastore client and the remote store.
//!
//! Defines the three calls the client needs (`AllocateIds`, `Lookup`,
//! `Commit`), the [`DatastoreRpc`] trait any transport implements, and the
//! framed binary codec used to carry the messages.

pub mod codec;
pub mod error;
pub mod loopback;
pub mod message;
pub mod traits;

pub use codec::RpcCodec;
pub use error::{codes, RpcError, RpcResult};
pub use loopback::FramedRpc;
pub use message::{
    AllocateIdsRequest, AllocateIdsResponse, CommitRequest, CommitResponse, LookupRequest,
    LookupResponse, Mutation, RpcMessage, MAX_MESSAGE_SIZE,
};
pub use traits::DatastoreRpc;
