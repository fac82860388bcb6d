use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot directory unavailable: {0}")]
    DirUnavailable(std::path::PathBuf),

    #[error("invalid snapshot key: {0:?}")]
    InvalidKey(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encode error: {0}")]
    Encode(#[from] habicase_core::CoreError),

    #[error("{0}")]
    Other(String),
}
