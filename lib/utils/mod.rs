use chrono::Utc;

/// fixed capacity of one cached/persisted block
pub const MAX_BLOCK_SIZE: u64 = 128 << 10;

/// capacity used when a file is created without an explicit `max_size`, the
/// largest value the store can hold
pub const UNBOUNDED_SIZE: u64 = i64::MAX as u64;

pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_OP_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// unix epoch in milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// identity of a file in the cache directory and in the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileKey {
    pub container: String,
    pub name: String,
}

impl FileKey {
    pub fn new(container: &str, name: &str) -> Self {
        Self {
            container: container.to_string(),
            name: name.to_string(),
        }
    }
}

impl std::fmt::Display for FileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.container, self.name)
    }
}
