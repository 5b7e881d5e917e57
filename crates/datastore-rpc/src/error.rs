use thiserror::Error;

/// Failures reported by a [`DatastoreRpc`](crate::DatastoreRpc) collaborator
/// or by the wire codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("framing error: {0}")]
    FramingError(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("remote error: code={code}, message={message}")]
    RemoteError { code: u32, message: String },
}

pub mod codes {
    pub const INVALID_REQUEST: u32 = 3;
    pub const DEADLINE_EXCEEDED: u32 = 4;
    pub const INTERNAL: u32 = 13;
    pub const UNAVAILABLE: u32 = 14;
}

impl RpcError {
    /// Status code carried in an error frame.
    pub fn code(&self) -> u32 {
        match self {
            Self::Unavailable(_) => codes::UNAVAILABLE,
            Self::DeadlineExceeded => codes::DEADLINE_EXCEEDED,
            Self::InvalidRequest(_) => codes::INVALID_REQUEST,
            Self::RemoteError { code, .. } => *code,
            Self::Internal(_)
            | Self::MessageTooLarge { .. }
            | Self::FramingError(_)
            | Self::Serialization(_)
            | Self::Deserialization(_) => codes::INTERNAL,
        }
    }

    /// Detail text carried in an error frame, without the variant prefix.
    pub fn detail(&self) -> String {
        match self {
            Self::Unavailable(m) | Self::InvalidRequest(m) | Self::Internal(m) => m.clone(),
            Self::DeadlineExceeded => String::new(),
            Self::RemoteError { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Rebuild a typed error from an error frame.
    pub fn from_code(code: u32, message: String) -> Self {
        match code {
            codes::UNAVAILABLE => Self::Unavailable(message),
            codes::DEADLINE_EXCEEDED => Self::DeadlineExceeded,
            codes::INVALID_REQUEST => Self::InvalidRequest(message),
            codes::INTERNAL => Self::Internal(message),
            _ => Self::RemoteError { code, message },
        }
    }
}

pub type RpcResult<T> = Result<T, RpcError>;
