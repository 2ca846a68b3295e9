use crate::error::{Error, Result};
use crate::utils::{DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_FLUSH_INTERVAL_MS, DEFAULT_OP_TIMEOUT_MS};
use std::path::PathBuf;
use std::time::Duration;

/// where the store lives and how long callers are willing to wait for it
#[derive(Debug, Clone)]
pub struct Options {
    /// `None` opens a private in-memory database
    pub db_path: Option<PathBuf>,
    /// deadline for acquiring the store connection, see [`Error::Timeout`]
    pub op_timeout: Duration,
    /// passed to sqlite's busy handler
    pub busy_timeout: Duration,
    /// period of the background [`crate::Flusher`]
    pub flush_interval: Duration,
}

impl Options {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: Some(db_path.into()),
            ..Self::in_memory()
        }
    }

    pub fn in_memory() -> Self {
        Self {
            db_path: None,
            op_timeout: Duration::from_millis(DEFAULT_OP_TIMEOUT_MS),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            flush_interval: Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS),
        }
    }

    pub fn validate(self) -> Result<Self> {
        if self.op_timeout.is_zero() {
            return Err(Error::InvalidConfig("op_timeout must be positive".to_string()));
        }
        if self.busy_timeout.is_zero() {
            return Err(Error::InvalidConfig("busy_timeout must be positive".to_string()));
        }
        if self.flush_interval.is_zero() {
            return Err(Error::InvalidConfig("flush_interval must be positive".to_string()));
        }
        if let Some(p) = &self.db_path {
            if p.as_os_str().is_empty() {
                return Err(Error::InvalidConfig("empty db_path".to_string()));
            }
        }
        Ok(self)
    }
}
