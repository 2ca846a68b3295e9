use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file {container}/{name} not found")]
    NotFound { container: String, name: String },

    #[error("file {container}/{name} already exists")]
    AlreadyExists { container: String, name: String },

    #[error("read offset {offset} is past end of file (size {size})")]
    PastEndOfFile { offset: u64, size: u64 },

    #[error("invalid file options: {0}")]
    InvalidOptions(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// block arithmetic produced a position outside the block cap
    #[error("invariant violation: {0}")]
    Invariant(String),

    #[error("store busy, gave up after {0:?}")]
    Timeout(Duration),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("meta encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn not_found(container: &str, name: &str) -> Self {
        Error::NotFound {
            container: container.to_string(),
            name: name.to_string(),
        }
    }

    pub(crate) fn exists(container: &str, name: &str) -> Self {
        Error::AlreadyExists {
            container: container.to_string(),
            name: name.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
