//! Error types for engine operations.

use thiserror::Error;

/// Programmer errors: the caller named something the catalog does not have.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("unknown page: {0}")]
    UnknownPage(String),
    #[error("unknown repeated group: {0}")]
    UnknownGroup(String),
    #[error("group {label} has no instance {index} (instances: {count})")]
    InvalidInstance {
        label: String,
        index: usize,
        count: usize,
    },
}

pub type Result<T> = std::result::Result<T, EngineError>;
