use thiserror::Error;

/// Structural validation errors for keys and entities.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("dataset must not be empty")]
    EmptyDataset,

    #[error("kind must not be empty")]
    EmptyKind,

    #[error("key name must not be empty")]
    EmptyName,

    #[error("key id must be positive, got {0}")]
    InvalidId(i64),

    #[error("property name must not be empty")]
    EmptyPropertyName,
}

/// Result alias for model construction.
pub type TypeResult<T> = Result<T, TypeError>;
