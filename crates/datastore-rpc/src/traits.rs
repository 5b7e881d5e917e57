use std::sync::Arc;

use crate::error::RpcResult;
use crate::message::{
    AllocateIdsRequest, AllocateIdsResponse, CommitRequest, CommitResponse, LookupRequest,
    LookupResponse,
};

/// The remote store as the client sees it.
///
/// Implementations must satisfy these invariants:
/// - `lookup` and `allocate_ids` answer with exactly one slot per requested
///   key, in request order.
/// - `commit` applies every mutation or none of them. A `Conflict` or
///   `Missing` response means nothing was written.
/// - Transport failures are reported as `Err`, never as a partial commit.
pub trait DatastoreRpc: Send + Sync {
    fn allocate_ids(&self, request: AllocateIdsRequest) -> RpcResult<AllocateIdsResponse>;

    fn lookup(&self, request: LookupRequest) -> RpcResult<LookupResponse>;

    fn commit(&self, request: CommitRequest) -> RpcResult<CommitResponse>;
}

impl<T: DatastoreRpc + ?Sized> DatastoreRpc for Arc<T> {
    fn allocate_ids(&self, request: AllocateIdsRequest) -> RpcResult<AllocateIdsResponse> {
        (**self).allocate_ids(request)
    }

    fn lookup(&self, request: LookupRequest) -> RpcResult<LookupResponse> {
        (**self).lookup(request)
    }

    fn commit(&self, request: CommitRequest) -> RpcResult<CommitResponse> {
        (**self).commit(request)
    }
}
