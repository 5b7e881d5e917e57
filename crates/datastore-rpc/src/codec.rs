use crate::error::{RpcError, RpcResult};
use crate::message::{RpcMessage, MAX_MESSAGE_SIZE};

/// Bytes of the big-endian length prefix.
const LEN_BYTES: usize = 4;
/// Length prefix plus the type tag.
const HEADER_LEN: usize = LEN_BYTES + 1;

/// Frame layout: `[u32 BE len][u8 tag][bincode payload]`, where `len`
/// counts the tag and the payload.
pub struct RpcCodec;

/// A parsed frame header.
struct Header {
    tag: u8,
    payload_len: usize,
}

impl Header {
    fn parse(data: &[u8]) -> RpcResult<Self> {
        let (len, rest) = data
            .split_first_chunk::<LEN_BYTES>()
            .ok_or_else(|| RpcError::FramingError("too short".into()))?;
        let &tag = rest
            .first()
            .ok_or_else(|| RpcError::FramingError("too short".into()))?;
        let payload_len = match u32::from_be_bytes(*len) as usize {
            0 => return Err(RpcError::FramingError("zero-length frame".into())),
            n => n - 1,
        };
        if payload_len > MAX_MESSAGE_SIZE {
            return Err(RpcError::MessageTooLarge {
                size: payload_len,
                max: MAX_MESSAGE_SIZE,
            });
        }
        Ok(Self { tag, payload_len })
    }

    fn frame_len(&self) -> usize {
        HEADER_LEN + self.payload_len
    }
}

impl RpcCodec {
    /// Frame `msg` for the wire.
    pub fn encode(msg: &RpcMessage) -> RpcResult<Vec<u8>> {
        let payload = Self::encode_payload(msg)?;
        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(RpcError::MessageTooLarge {
                size: payload.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        let len = u32::try_from(payload.len() + 1)
            .map_err(|_| RpcError::Serialization("frame length overflows u32".into()))?;
        let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
        frame.extend_from_slice(&len.to_be_bytes());
        frame.push(msg.type_tag());
        frame.extend(payload);
        Ok(frame)
    }

    /// Decode the first frame in `data`. Returns the message and the number
    /// of bytes it occupied; trailing bytes are left for the next call.
    pub fn decode(data: &[u8]) -> RpcResult<(RpcMessage, usize)> {
        let header = Header::parse(data)?;
        let payload = data.get(HEADER_LEN..header.frame_len()).ok_or_else(|| {
            RpcError::FramingError(format!(
                "incomplete: have {}, need {}",
                data.len(),
                header.frame_len()
            ))
        })?;
        let msg = Self::decode_payload(payload)?;
        if msg.type_tag() != header.tag {
            return Err(RpcError::FramingError(format!(
                "tag {} does not match {} payload",
                header.tag,
                msg.type_name()
            )));
        }
        Ok((msg, header.frame_len()))
    }

    /// Encode payload only (no framing).
    pub fn encode_payload(msg: &RpcMessage) -> RpcResult<Vec<u8>> {
        bincode::serialize(msg).map_err(|e| RpcError::Serialization(e.to_string()))
    }

    /// Decode payload only (no framing).
    pub fn decode_payload(data: &[u8]) -> RpcResult<RpcMessage> {
        bincode::deserialize(data).map_err(|e| RpcError::Deserialization(e.to_string()))
    }
}
