mod sqlite;
#[cfg(feature = "stats")]
mod stats;
#[cfg(not(feature = "stats"))]
mod stats {
    #[derive(Clone, Copy, Debug, Default)]
    pub struct StatsSnapshot {
        pub write_calls: u64,
        pub write_bytes: u64,
        pub load_calls: u64,
        pub load_bytes: u64,
        pub flush_calls: u64,
        pub flush_bytes: u64,
        pub flush_ns: u64,
        pub flush_errors: u64,
    }

    pub(crate) fn record_write(_: usize) {}

    pub(crate) fn record_load(_: usize) {}

    pub(crate) fn record_flush(_: u64, _: u64, _: bool) {}

    pub(crate) fn snapshot() -> StatsSnapshot {
        StatsSnapshot::default()
    }
}

use crate::error::Result;
use crate::meta::FileInfo;

pub use sqlite::SqliteStore;
pub use stats::StatsSnapshot;
pub(crate) use stats::{record_flush, record_load, record_write, snapshot};

/// durable side of the block store, one row per file plus one row per
/// non-empty block
pub trait Backend: Send + Sync {
    /// fails with `AlreadyExists` when the identity is taken
    fn insert_file(&self, info: &FileInfo) -> Result<()>;

    fn get_file(&self, container: &str, name: &str) -> Result<Option<FileInfo>>;

    /// update the file row and replace `blocks` in one transaction, returns
    /// false without writing anything when the file row is gone
    fn persist(&self, info: &FileInfo, blocks: &[(u64, &[u8])]) -> Result<bool>;

    fn load_block(&self, container: &str, name: &str, idx: u64) -> Result<Option<Vec<u8>>>;

    /// returns false if there was no such file
    fn delete_file(&self, container: &str, name: &str) -> Result<bool>;

    /// returns the number of files removed
    fn delete_container(&self, container: &str) -> Result<usize>;

    /// ordered by name
    fn list_files(&self, container: &str) -> Result<Vec<FileInfo>>;

    /// ordered by container then name
    fn list_all_files(&self) -> Result<Vec<FileInfo>>;

    fn container_ids(&self) -> Result<Vec<String>>;
}
