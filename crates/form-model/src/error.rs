use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid group label: {0:?}")]
    InvalidGroupLabel(String),
    #[error("duplicate page in catalog: {0}")]
    DuplicatePage(String),
    #[error("invalid page name: {0:?}")]
    InvalidPageName(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
