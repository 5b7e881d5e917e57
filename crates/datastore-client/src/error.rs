use thiserror::Error;

use datastore_rpc::RpcError;
use datastore_types::{Key, TypeError};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DatastoreError {
    #[error("entity already exists: {}", key_list(.keys))]
    AlreadyExists { keys: Vec<Key> },

    #[error("entity not found: {}", key_list(.keys))]
    NotFound { keys: Vec<Key> },

    #[error("datastore unavailable: {0}")]
    Unavailable(String),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

fn key_list(keys: &[Key]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<RpcError> for DatastoreError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Unavailable(msg) => Self::Unavailable(msg),
            RpcError::DeadlineExceeded => Self::DeadlineExceeded,
            RpcError::InvalidRequest(msg) => Self::InvalidArgument(msg),
            RpcError::Internal(msg) => Self::Internal(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<TypeError> for DatastoreError {
    fn from(err: TypeError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

pub type DatastoreResult<T> = Result<T, DatastoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use datastore_types::KeyBuilder;

    #[test]
    fn transport_errors_pass_through() {
        assert_eq!(
            DatastoreError::from(RpcError::Unavailable("down".into())),
            DatastoreError::Unavailable("down".into())
        );
        assert_eq!(
            DatastoreError::from(RpcError::DeadlineExceeded),
            DatastoreError::DeadlineExceeded
        );
    }

    #[test]
    fn codec_errors_are_internal() {
        let err = DatastoreError::from(RpcError::FramingError("too short".into()));
        assert!(matches!(err, DatastoreError::Internal(ref m) if m.contains("too short")));
        let err = DatastoreError::from(RpcError::RemoteError { code: 99, message: "odd".into() });
        assert!(matches!(err, DatastoreError::Internal(_)));
    }

    #[test]
    fn type_errors_are_invalid_arguments() {
        let err = DatastoreError::from(TypeError::InvalidId(0));
        assert!(matches!(err, DatastoreError::InvalidArgument(_)));
    }

    #[test]
    fn display_lists_keys() {
        let keys = vec![
            KeyBuilder::new("d", "K1", "a").build().unwrap(),
            KeyBuilder::new("d", "K1", 2i64).build().unwrap(),
        ];
        let msg = DatastoreError::AlreadyExists { keys: keys.clone() }.to_string();
        assert!(msg.starts_with("entity already exists: "));
        assert!(msg.contains(&keys[0].to_string()));
        assert!(msg.contains(&keys[1].to_string()));
    }
}
