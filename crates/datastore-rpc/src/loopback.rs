//! In-process transport that runs every call through the wire codec.
//!
//! [`FramedRpc`] frames each request, decodes it as a remote peer would,
//! hands it to the wrapped collaborator, then frames and decodes the reply.
//! Anything that cannot survive the wire fails here exactly as it would on
//! a real connection.

use tracing::debug;

use crate::codec::RpcCodec;
use crate::error::{RpcError, RpcResult};
use crate::message::{
    AllocateIdsRequest, AllocateIdsResponse, CommitRequest, CommitResponse, LookupRequest,
    LookupResponse, RpcMessage,
};
use crate::traits::DatastoreRpc;

/// A [`DatastoreRpc`] that serializes all traffic to an inner collaborator.
#[derive(Debug)]
pub struct FramedRpc<R> {
    inner: R,
}

impl<R: DatastoreRpc> FramedRpc<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn round_trip(&self, request: RpcMessage) -> RpcResult<RpcMessage> {
        let request_frame = RpcCodec::encode(&request)?;
        let (decoded, _) = RpcCodec::decode(&request_frame)?;

        let reply = self.serve(decoded);
        let reply_frame = RpcCodec::encode(&reply)?;
        let (reply, _) = RpcCodec::decode(&reply_frame)?;

        debug!(
            request = request.type_name(),
            reply = reply.type_name(),
            request_bytes = request_frame.len(),
            reply_bytes = reply_frame.len(),
            "rpc round trip"
        );

        match reply {
            RpcMessage::Error { code, message } => Err(RpcError::from_code(code, message)),
            other => Ok(other),
        }
    }

    /// The remote side: dispatch a decoded request to the collaborator.
    fn serve(&self, request: RpcMessage) -> RpcMessage {
        let result = match request {
            RpcMessage::AllocateIdsRequest(r) => self
                .inner
                .allocate_ids(r)
                .map(RpcMessage::AllocateIdsResponse),
            RpcMessage::LookupRequest(r) => self.inner.lookup(r).map(RpcMessage::LookupResponse),
            RpcMessage::CommitRequest(r) => self.inner.commit(r).map(RpcMessage::CommitResponse),
            other => Err(RpcError::InvalidRequest(format!(
                "{} is not a request",
                other.type_name()
            ))),
        };
        result.unwrap_or_else(|e| RpcMessage::Error {
            code: e.code(),
            message: e.detail(),
        })
    }
}

fn unexpected(reply: RpcMessage) -> RpcError {
    RpcError::Internal(format!("unexpected reply: {}", reply.type_name()))
}

impl<R: DatastoreRpc> DatastoreRpc for FramedRpc<R> {
    fn allocate_ids(&self, request: AllocateIdsRequest) -> RpcResult<AllocateIdsResponse> {
        match self.round_trip(RpcMessage::AllocateIdsRequest(request))? {
            RpcMessage::AllocateIdsResponse(r) => Ok(r),
            other => Err(unexpected(other)),
        }
    }

    fn lookup(&self, request: LookupRequest) -> RpcResult<LookupResponse> {
        match self.round_trip(RpcMessage::LookupRequest(request))? {
            RpcMessage::LookupResponse(r) => Ok(r),
            other => Err(unexpected(other)),
        }
    }

    fn commit(&self, request: CommitRequest) -> RpcResult<CommitResponse> {
        match self.round_trip(RpcMessage::CommitRequest(request))? {
            RpcMessage::CommitResponse(r) => Ok(r),
            other => Err(unexpected(other)),
        }
    }
}
